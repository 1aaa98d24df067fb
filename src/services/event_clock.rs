use chrono::{DateTime, Utc};

use crate::models::event::{AssessmentEvent, EventState};
use crate::models::test_flow::TestFlow;
use crate::models::tool::AssessmentTool;
use crate::utils::time::at_time_of_day;

/// One flow entry placed on the event's calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTool {
    pub tool: AssessmentTool,
    pub release_at: DateTime<Utc>,
    pub start_working_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

/// Lifecycle of an event derived purely from its stored instants. Two
/// readers with the same `now` always agree.
#[derive(Debug, Clone)]
pub struct EventClock {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    schedule: Vec<ScheduledTool>,
}

impl EventClock {
    pub fn new(event: &AssessmentEvent, flow: &TestFlow) -> Self {
        let day = event.start_date.date_naive();
        let schedule: Vec<ScheduledTool> = flow
            .tools
            .iter()
            .map(|entry| {
                let start_working_at = at_time_of_day(day, entry.start_working_time);
                ScheduledTool {
                    release_at: at_time_of_day(day, entry.release_time),
                    due_at: start_working_at + entry.tool.duration(),
                    start_working_at,
                    tool: entry.tool.clone(),
                }
            })
            .collect();

        let end = schedule
            .iter()
            .map(|s| s.due_at.max(s.release_at))
            .max()
            .unwrap_or(event.start_date);

        Self {
            start: event.start_date,
            end,
            schedule,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// In flow order, i.e. ascending release time.
    pub fn schedule(&self) -> &[ScheduledTool] {
        &self.schedule
    }

    pub fn state(&self, now: DateTime<Utc>) -> EventState {
        if now < self.start {
            EventState::Scheduled
        } else if now < self.end {
            EventState::Active
        } else {
            EventState::Concluded
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == EventState::Active
    }

    /// Entries released strictly before `now`; the complement of `pending`.
    pub fn released(&self, now: DateTime<Utc>) -> impl Iterator<Item = &ScheduledTool> {
        self.schedule.iter().filter(move |s| s.release_at < now)
    }

    /// Latest released tool, if any.
    pub fn current_tool(&self, now: DateTime<Utc>) -> Option<&ScheduledTool> {
        self.released(now).last()
    }

    /// Entries whose release instant has not passed yet.
    pub fn pending(&self, now: DateTime<Utc>) -> Vec<ScheduledTool> {
        self.schedule
            .iter()
            .filter(|s| s.release_at >= now)
            .cloned()
            .collect()
    }

    pub fn find(&self, tool_id: uuid::Uuid) -> Option<&ScheduledTool> {
        self.schedule.iter().find(|s| s.tool.id == tool_id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::test_flow::TestFlowTool;
    use crate::models::tool::ToolKind;
    use chrono::NaiveTime;
    use uuid::Uuid;

    pub(crate) fn tool(minutes: i32) -> AssessmentTool {
        AssessmentTool {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            name: "tool".into(),
            description: None,
            kind: ToolKind::Assignment {
                expected_file_format: "pdf".into(),
                duration_minutes: minutes,
            },
            created_at: Utc::now(),
        }
    }

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn fixture() -> (AssessmentEvent, TestFlow) {
        let start: DateTime<Utc> = "2022-12-02T09:00:00Z".parse().unwrap();
        let flow = TestFlow {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            name: "flow".into(),
            tools: vec![
                TestFlowTool {
                    tool: tool(30),
                    release_time: hms(9, 0, 0),
                    start_working_time: hms(9, 5, 0),
                },
                TestFlowTool {
                    tool: tool(60),
                    release_time: hms(10, 0, 0),
                    start_working_time: hms(10, 0, 0),
                },
            ],
            created_at: Utc::now(),
        };
        let event = AssessmentEvent {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            name: "event".into(),
            start_date: start,
            test_flow_id: flow.id,
            created_at: start,
            updated_at: start,
        };
        (event, flow)
    }

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn state_follows_the_wall_clock() {
        let (event, flow) = fixture();
        let clock = EventClock::new(&event, &flow);
        assert_eq!(clock.end(), at("2022-12-02T11:00:00Z"));
        assert_eq!(clock.state(at("2022-12-02T08:59:59Z")), EventState::Scheduled);
        assert_eq!(clock.state(at("2022-12-02T09:00:00Z")), EventState::Active);
        assert_eq!(clock.state(at("2022-12-02T10:59:59Z")), EventState::Active);
        assert_eq!(clock.state(at("2022-12-02T11:00:00Z")), EventState::Concluded);
    }

    #[test]
    fn release_instants_use_the_event_date() {
        let (event, flow) = fixture();
        let clock = EventClock::new(&event, &flow);
        let releases: Vec<_> = clock.schedule().iter().map(|s| s.release_at).collect();
        assert_eq!(
            releases,
            vec![at("2022-12-02T09:00:00Z"), at("2022-12-02T10:00:00Z")]
        );
        assert_eq!(clock.schedule()[0].due_at, at("2022-12-02T09:35:00Z"));
    }

    #[test]
    fn current_tool_is_the_latest_released() {
        let (event, flow) = fixture();
        let clock = EventClock::new(&event, &flow);
        assert!(clock.current_tool(at("2022-12-02T08:00:00Z")).is_none());
        let current = clock.current_tool(at("2022-12-02T10:30:00Z")).unwrap();
        assert_eq!(current.tool.id, flow.tools[1].tool.id);
        assert_eq!(clock.released(at("2022-12-02T09:30:00Z")).count(), 1);
    }

    #[test]
    fn pending_excludes_passed_releases() {
        let (event, flow) = fixture();
        let clock = EventClock::new(&event, &flow);
        let pending = clock.pending(at("2022-12-02T09:00:01Z"));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].tool.id, flow.tools[1].tool.id);
        assert_eq!(clock.pending(at("2022-12-02T09:00:00Z")).len(), 2);
    }

    #[test]
    fn released_and_pending_split_at_a_release_instant() {
        let (event, flow) = fixture();
        let clock = EventClock::new(&event, &flow);
        let now = at("2022-12-02T10:00:00Z");
        let released: Vec<_> = clock.released(now).map(|s| s.tool.id).collect();
        let pending: Vec<_> = clock.pending(now).into_iter().map(|s| s.tool.id).collect();
        assert_eq!(released, vec![flow.tools[0].tool.id]);
        assert_eq!(pending, vec![flow.tools[1].tool.id]);
    }
}
