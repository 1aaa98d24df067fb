use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::database::{EventPatch, NewEvent, Repo};
use crate::dto::event_dto::{CreateEventPayload, EventResponse, UpdateEventPayload};
use crate::error::{Error, Result};
use crate::models::event::AssessmentEvent;
use crate::models::user::Principal;
use crate::models::test_flow::TestFlow;
use crate::services::event_clock::EventClock;
use crate::utils::time::{parse_iso_datetime, Clock};
use crate::utils::validation::char_len;

pub const MIN_EVENT_NAME_LEN: usize = 3;
pub const MAX_EVENT_NAME_LEN: usize = 50;

#[derive(Clone)]
pub struct EventService {
    repo: Arc<dyn Repo>,
    clock: Arc<dyn Clock>,
}

impl EventService {
    pub fn new(repo: Arc<dyn Repo>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn create_event(&self, company_id: Uuid, payload: CreateEventPayload) -> Result<AssessmentEvent> {
        let name = validate_event_name(payload.name.as_deref())?;
        let start_date = validate_start_date(payload.start_date.as_deref(), self.clock.today())?;
        let flow_id = payload.test_flow_id.ok_or_else(|| {
            Error::BadRequest("The assessment event must be bound to a test flow.".to_string())
        })?;
        self.usable_flow(flow_id, company_id).await?;

        let event = self
            .repo
            .event_new(NewEvent {
                company_id,
                name,
                start_date,
                test_flow_id: flow_id,
            })
            .await?;
        tracing::info!(event_id = %event.id, start = %event.start_date, "assessment event created");
        Ok(event)
    }

    pub async fn update_event(
        &self,
        id: Uuid,
        company_id: Uuid,
        payload: UpdateEventPayload,
    ) -> Result<AssessmentEvent> {
        let event = self.get_owned_event(id, company_id).await?;

        if self.repo.attempt_any_submitted(id).await? {
            return Err(Error::BadRequest(
                "The assessment event can no longer be modified because attempts were submitted."
                    .to_string(),
            ));
        }

        let mut patch = EventPatch::default();
        match payload.start_date.as_deref() {
            // Full-timestamp comparison here, date-only on create.
            None if event.start_date < self.clock.now() => {
                return Err(Error::BadRequest(
                    "The assessment event has already started.".to_string(),
                ))
            }
            None => {}
            Some(raw) => {
                patch.start_date = Some(validate_start_date(Some(raw), self.clock.today())?);
            }
        }
        if payload.name.is_some() {
            patch.name = Some(validate_event_name(payload.name.as_deref())?);
        }
        if let Some(flow_id) = payload.test_flow_id {
            // Attempt shells are bound to the current flow's tools.
            if flow_id != event.test_flow_id
                && !self.repo.participation_select_by_event(id).await?.is_empty()
            {
                return Err(Error::BadRequest(
                    "The test flow cannot be changed once participants are registered."
                        .to_string(),
                ));
            }
            self.usable_flow(flow_id, company_id).await?;
            patch.test_flow_id = Some(flow_id);
        }

        let event = self.repo.event_update(id, patch).await?;
        tracing::info!(event_id = %event.id, "assessment event updated");
        Ok(event)
    }

    /// There is no teardown path for events.
    pub async fn delete_event(&self, id: Uuid, _company_id: Uuid) -> Result<()> {
        tracing::warn!(event_id = %id, "rejected assessment event deletion");
        Err(Error::Unsupported(
            "Assessment events cannot be deleted.".to_string(),
        ))
    }

    pub async fn load_event(&self, id: Uuid) -> Result<AssessmentEvent> {
        self.repo
            .event_try_load(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Assessment event of id {} does not exist", id)))
    }

    pub async fn get_owned_event(&self, id: Uuid, company_id: Uuid) -> Result<AssessmentEvent> {
        let event = self.load_event(id).await?;
        if event.company_id != company_id {
            return Err(Error::Forbidden(format!(
                "Assessment event of id {} does not belong to your company",
                id
            )));
        }
        Ok(event)
    }

    /// Readable by the owning company, its assessors, and the event's
    /// participants.
    pub async fn get_visible_event(&self, id: Uuid, principal: &Principal) -> Result<AssessmentEvent> {
        let event = self.load_event(id).await?;
        let visible = match principal {
            Principal::Company(c) => c.id == event.company_id,
            Principal::Assessor(a) => a.company_id == event.company_id,
            Principal::Assessee(a) => self.repo.participation_find(event.id, a.id).await?.is_some(),
        };
        if !visible {
            return Err(Error::Forbidden(format!(
                "You have no access to assessment event of id {}",
                id
            )));
        }
        Ok(event)
    }

    pub async fn list_events(&self, company_id: Uuid) -> Result<Vec<AssessmentEvent>> {
        self.repo.event_select_by_company(company_id).await
    }

    pub async fn events_for_assessee(&self, assessee_id: Uuid) -> Result<Vec<AssessmentEvent>> {
        self.repo.event_select_by_assessee(assessee_id).await
    }

    pub async fn clock_for(&self, event: &AssessmentEvent) -> Result<EventClock> {
        let flow = self.repo.flow_try_load(event.test_flow_id).await?.ok_or_else(|| {
            Error::Internal(format!(
                "Assessment event {} is bound to missing test flow {}",
                event.id, event.test_flow_id
            ))
        })?;
        Ok(EventClock::new(event, &flow))
    }

    pub async fn describe(&self, event: AssessmentEvent) -> Result<EventResponse> {
        let clock = self.clock_for(&event).await?;
        Ok(EventResponse::new(event, &clock, self.clock.now()))
    }

    pub async fn is_active(&self, event: &AssessmentEvent) -> Result<bool> {
        Ok(self.clock_for(event).await?.is_active(self.clock.now()))
    }

    pub async fn active_events_for_assessor(&self, assessor_id: Uuid) -> Result<Vec<AssessmentEvent>> {
        let mut active = Vec::new();
        for event in self.repo.event_select_by_assessor(assessor_id).await? {
            if self.is_active(&event).await? {
                active.push(event);
            }
        }
        Ok(active)
    }

    async fn usable_flow(&self, flow_id: Uuid, company_id: Uuid) -> Result<TestFlow> {
        let flow = self.repo.flow_try_load(flow_id).await?;
        match flow {
            Some(flow) if flow.company_id == company_id && flow.is_usable() => Ok(flow),
            _ => {
                let company = self
                    .repo
                    .company_try_load(company_id)
                    .await?
                    .map(|c| c.name)
                    .unwrap_or_else(|| company_id.to_string());
                Err(Error::NotFound(format!(
                    "Active test flow of id {} belonging to {} does not exist",
                    flow_id, company
                ))
                .into_invalid_request())
            }
        }
    }
}

fn validate_event_name(name: Option<&str>) -> Result<String> {
    let name = name.map(str::trim).unwrap_or_default();
    let len = char_len(name);
    if !(MIN_EVENT_NAME_LEN..=MAX_EVENT_NAME_LEN).contains(&len) {
        return Err(Error::BadRequest(format!(
            "The assessment event name must be between {} and {} characters.",
            MIN_EVENT_NAME_LEN, MAX_EVENT_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

/// Only the date matters: any time today is still acceptable.
fn validate_start_date(raw: Option<&str>, today: NaiveDate) -> Result<DateTime<Utc>> {
    let raw = raw.ok_or_else(|| {
        Error::BadRequest("The assessment event start date is required.".to_string())
    })?;
    let start = parse_iso_datetime(raw).ok_or_else(|| {
        Error::BadRequest(
            "The assessment event start date must be an ISO-8601 date-time.".to_string(),
        )
    })?;
    if start.date_naive() < today {
        return Err(Error::BadRequest(
            "The assessment event must not begin on a previous date.".to_string(),
        ));
    }
    Ok(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryRepo, NewFlowEntry, NewTestFlow, NewTool, FlowsRepo, ToolsRepo};
    use crate::models::event::EventState;
    use crate::models::tool::ToolKind;
    use crate::utils::time::FixedClock;
    use axum::http::StatusCode;
    use chrono::NaiveTime;

    struct Fixture {
        svc: EventService,
        repo: MemoryRepo,
        clock: Arc<FixedClock>,
        company: Uuid,
        flow: Uuid,
    }

    fn at(s: &str) -> DateTime<Utc> {
        parse_iso_datetime(s).unwrap()
    }

    async fn usable_flow(repo: &MemoryRepo, company: Uuid) -> Uuid {
        let tool = repo
            .tool_new(NewTool {
                company_id: company,
                name: "Essay".into(),
                description: None,
                kind: ToolKind::Assignment {
                    expected_file_format: "pdf".into(),
                    duration_minutes: 60,
                },
            })
            .await
            .unwrap();
        repo.flow_new(NewTestFlow {
            company_id: company,
            name: "Flow".into(),
            entries: vec![NewFlowEntry {
                tool_id: tool.id,
                release_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                start_working_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            }],
        })
        .await
        .unwrap()
        .id
    }

    async fn fixture(now: &str) -> Fixture {
        let repo = MemoryRepo::new();
        let company = repo.add_company("Acme", "hr@acme.test").id;
        let flow = usable_flow(&repo, company).await;
        let clock = Arc::new(FixedClock::new(at(now)));
        let svc = EventService::new(Arc::new(repo.clone()), clock.clone());
        Fixture {
            svc,
            repo,
            clock,
            company,
            flow,
        }
    }

    fn payload(name: &str, start: &str, flow: Uuid) -> CreateEventPayload {
        CreateEventPayload {
            name: Some(name.into()),
            start_date: Some(start.into()),
            test_flow_id: Some(flow),
        }
    }

    #[tokio::test]
    async fn future_date_is_accepted() {
        let f = fixture("2022-12-01T12:00:00Z").await;
        let res = f.svc.create_event(f.company, payload("Assessment", "2022-12-02", f.flow)).await;
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn past_date_is_rejected() {
        let f = fixture("2022-12-03T00:00:00Z").await;
        let err = f
            .svc
            .create_event(f.company, payload("Assessment", "2022-12-02", f.flow))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "The assessment event must not begin on a previous date.");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn earlier_today_is_still_accepted() {
        let f = fixture("2022-12-02T18:00:00Z").await;
        let res = f
            .svc
            .create_event(f.company, payload("Assessment", "2022-12-02T08:00:00Z", f.flow))
            .await;
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn created_event_reads_back_identically() {
        let f = fixture("2022-12-01T12:00:00Z").await;
        let created = f
            .svc
            .create_event(f.company, payload("Round trip", "2022-12-05T09:30:00Z", f.flow))
            .await
            .unwrap();
        let loaded = f.svc.load_event(created.id).await.unwrap();
        assert_eq!(loaded.name, "Round trip");
        assert_eq!(loaded.start_date, at("2022-12-05T09:30:00Z"));
        assert_eq!(loaded.test_flow_id, f.flow);
    }

    #[tokio::test]
    async fn name_length_is_enforced() {
        let f = fixture("2022-12-01T12:00:00Z").await;
        let long = "n".repeat(51);
        for bad in ["ab", long.as_str()] {
            let res = f.svc.create_event(f.company, payload(bad, "2022-12-02", f.flow)).await;
            assert!(matches!(res, Err(Error::BadRequest(_))));
        }
    }

    #[tokio::test]
    async fn unusable_or_foreign_flow_is_rejected() {
        let f = fixture("2022-12-01T12:00:00Z").await;
        let empty = f
            .repo
            .flow_new(NewTestFlow {
                company_id: f.company,
                name: "Empty".into(),
                entries: vec![],
            })
            .await
            .unwrap();
        let err = f
            .svc
            .create_event(f.company, payload("Assessment", "2022-12-02", empty.id))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Active test flow of id {} belonging to Acme does not exist", empty.id)
        );

        let other = f.repo.add_company("Other", "hr@other.test");
        let err = f
            .svc
            .create_event(other.id, payload("Assessment", "2022-12-02", f.flow))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("belonging to Other"));
    }

    #[tokio::test]
    async fn missing_fields_fail_fast() {
        let f = fixture("2022-12-01T12:00:00Z").await;
        let res = f.svc.create_event(f.company, CreateEventPayload::default()).await;
        assert!(matches!(res, Err(Error::BadRequest(_))));
        let res = f
            .svc
            .create_event(
                f.company,
                CreateEventPayload {
                    test_flow_id: None,
                    ..payload("Assessment", "2022-12-02", f.flow)
                },
            )
            .await;
        assert!(matches!(res, Err(Error::BadRequest(_))));
    }

    #[tokio::test]
    async fn update_requires_ownership() {
        let f = fixture("2022-12-01T12:00:00Z").await;
        let event = f
            .svc
            .create_event(f.company, payload("Assessment", "2022-12-02", f.flow))
            .await
            .unwrap();
        let other = f.repo.add_company("Other", "hr@other.test");
        let err = f
            .svc
            .update_event(event.id, other.id, UpdateEventPayload::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn update_merges_and_revalidates() {
        let f = fixture("2022-12-01T12:00:00Z").await;
        let event = f
            .svc
            .create_event(f.company, payload("Assessment", "2022-12-02T09:00:00Z", f.flow))
            .await
            .unwrap();
        let updated = f
            .svc
            .update_event(
                event.id,
                f.company,
                UpdateEventPayload {
                    name: Some("Renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.start_date, event.start_date);

        let res = f
            .svc
            .update_event(
                event.id,
                f.company,
                UpdateEventPayload {
                    start_date: Some("2022-11-30".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn started_event_rejects_edits_without_new_start() {
        let f = fixture("2022-12-01T12:00:00Z").await;
        let event = f
            .svc
            .create_event(f.company, payload("Assessment", "2022-12-01T13:00:00Z", f.flow))
            .await
            .unwrap();
        f.clock.set(at("2022-12-01T13:00:01Z"));
        let err = f
            .svc
            .update_event(
                event.id,
                f.company,
                UpdateEventPayload {
                    name: Some("Late rename".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "The assessment event has already started.");

        // Moving the start to later today is still allowed.
        let moved = f
            .svc
            .update_event(
                event.id,
                f.company,
                UpdateEventPayload {
                    start_date: Some("2022-12-01T20:00:00Z".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.start_date, at("2022-12-01T20:00:00Z"));
    }

    #[tokio::test]
    async fn delete_is_never_supported() {
        let f = fixture("2022-12-01T12:00:00Z").await;
        let event = f
            .svc
            .create_event(f.company, payload("Assessment", "2022-12-02", f.flow))
            .await
            .unwrap();
        let err = f.svc.delete_event(event.id, f.company).await.unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[tokio::test]
    async fn describe_reports_state_and_end() {
        let f = fixture("2022-12-02T10:30:00Z").await;
        let event = f
            .svc
            .create_event(f.company, payload("Assessment", "2022-12-02T09:00:00Z", f.flow))
            .await
            .unwrap();
        let view = f.svc.describe(event.clone()).await.unwrap();
        assert_eq!(view.state, EventState::Active);
        assert_eq!(view.end_date, at("2022-12-02T11:00:00Z"));
        assert!(f.svc.is_active(&event).await.unwrap());

        f.clock.set(at("2022-12-02T11:00:00Z"));
        assert!(!f.svc.is_active(&event).await.unwrap());
    }
}
