use super::{
    AttemptShell, AttemptsRepo, EventPatch, EventsRepo, FlowsRepo, NewEvent, NewParticipation,
    NewTestFlow, NewTool, ParticipationsRepo, RoomsRepo, ToolsRepo, UsersRepo,
};
use crate::error::{Error, Result};
use crate::models::{
    event::AssessmentEvent,
    participation::Participation,
    test_flow::{TestFlow, TestFlowTool},
    tool::AssessmentTool,
    tool_attempt::ToolAttempt,
    user::{Assessee, Assessor, Company},
    video_conference::VideoConferenceRoom,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Data {
    companies: Vec<Company>,
    assessors: Vec<Assessor>,
    assessees: Vec<Assessee>,
    tools: Vec<AssessmentTool>,
    flows: Vec<TestFlow>,
    events: Vec<AssessmentEvent>,
    parts: Vec<Participation>,
    attempts: Vec<ToolAttempt>,
    rooms: Vec<VideoConferenceRoom>,
}

/// In-process repository; every call holds one lock for its whole body, so
/// each operation is atomic.
#[derive(Clone, Debug, Default)]
pub struct MemoryRepo {
    conn: Arc<Mutex<Data>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> MutexGuard<'_, Data> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    // Accounts are provisioned outside this service; these seed them.

    pub fn add_company(&self, name: &str, email: &str) -> Company {
        let company = Company {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
        };
        self.data().companies.push(company.clone());
        company
    }

    pub fn add_assessor(&self, company_id: Uuid, email: &str, first: &str, last: &str) -> Assessor {
        let assessor = Assessor {
            id: Uuid::new_v4(),
            company_id,
            email: email.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
        };
        self.data().assessors.push(assessor.clone());
        assessor
    }

    pub fn add_assessee(&self, email: &str, first: &str, last: &str) -> Assessee {
        let assessee = Assessee {
            id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
        };
        self.data().assessees.push(assessee.clone());
        assessee
    }
}

#[async_trait]
impl UsersRepo for MemoryRepo {
    async fn company_try_load(&self, id: Uuid) -> Result<Option<Company>> {
        Ok(self.data().companies.iter().find(|c| c.id == id).cloned())
    }

    async fn company_try_load_by_email(&self, email: &str) -> Result<Option<Company>> {
        Ok(self.data().companies.iter().find(|c| c.email == email).cloned())
    }

    async fn assessor_try_load(&self, id: Uuid) -> Result<Option<Assessor>> {
        Ok(self.data().assessors.iter().find(|a| a.id == id).cloned())
    }

    async fn assessor_try_load_by_email(&self, email: &str) -> Result<Option<Assessor>> {
        Ok(self.data().assessors.iter().find(|a| a.email == email).cloned())
    }

    async fn assessee_try_load(&self, id: Uuid) -> Result<Option<Assessee>> {
        Ok(self.data().assessees.iter().find(|a| a.id == id).cloned())
    }

    async fn assessee_try_load_by_email(&self, email: &str) -> Result<Option<Assessee>> {
        Ok(self.data().assessees.iter().find(|a| a.email == email).cloned())
    }
}

#[async_trait]
impl ToolsRepo for MemoryRepo {
    async fn tool_new(&self, tool: NewTool) -> Result<AssessmentTool> {
        let tool = AssessmentTool {
            id: Uuid::new_v4(),
            company_id: tool.company_id,
            name: tool.name,
            description: tool.description,
            kind: tool.kind,
            created_at: Utc::now(),
        };
        self.data().tools.push(tool.clone());
        Ok(tool)
    }

    async fn tool_try_load(&self, id: Uuid) -> Result<Option<AssessmentTool>> {
        Ok(self.data().tools.iter().find(|t| t.id == id).cloned())
    }

    async fn tool_select_by_company(&self, company_id: Uuid) -> Result<Vec<AssessmentTool>> {
        Ok(self
            .data()
            .tools
            .iter()
            .filter(|t| t.company_id == company_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FlowsRepo for MemoryRepo {
    async fn flow_new(&self, flow: NewTestFlow) -> Result<TestFlow> {
        let mut data = self.data();
        let mut tools = Vec::with_capacity(flow.entries.len());
        for entry in &flow.entries {
            let tool = data
                .tools
                .iter()
                .find(|t| t.id == entry.tool_id)
                .cloned()
                .ok_or_else(|| {
                    Error::NotFound(format!("Tool of id {} does not exist", entry.tool_id))
                })?;
            tools.push(TestFlowTool {
                tool,
                release_time: entry.release_time,
                start_working_time: entry.start_working_time,
            });
        }
        let flow = TestFlow {
            id: Uuid::new_v4(),
            company_id: flow.company_id,
            name: flow.name,
            tools,
            created_at: Utc::now(),
        };
        data.flows.push(flow.clone());
        Ok(flow)
    }

    async fn flow_try_load(&self, id: Uuid) -> Result<Option<TestFlow>> {
        Ok(self.data().flows.iter().find(|f| f.id == id).cloned())
    }

    async fn flow_select_by_company(&self, company_id: Uuid) -> Result<Vec<TestFlow>> {
        Ok(self
            .data()
            .flows
            .iter()
            .filter(|f| f.company_id == company_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EventsRepo for MemoryRepo {
    async fn event_new(&self, event: NewEvent) -> Result<AssessmentEvent> {
        let now = Utc::now();
        let event = AssessmentEvent {
            id: Uuid::new_v4(),
            company_id: event.company_id,
            name: event.name,
            start_date: event.start_date,
            test_flow_id: event.test_flow_id,
            created_at: now,
            updated_at: now,
        };
        self.data().events.push(event.clone());
        Ok(event)
    }

    async fn event_try_load(&self, id: Uuid) -> Result<Option<AssessmentEvent>> {
        Ok(self.data().events.iter().find(|e| e.id == id).cloned())
    }

    async fn event_update(&self, id: Uuid, patch: EventPatch) -> Result<AssessmentEvent> {
        let mut data = self.data();
        let cur = data
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::NotFound(format!("Assessment event of id {} does not exist", id)))?;
        if let Some(name) = patch.name {
            cur.name = name;
        }
        if let Some(start_date) = patch.start_date {
            cur.start_date = start_date;
        }
        if let Some(test_flow_id) = patch.test_flow_id {
            cur.test_flow_id = test_flow_id;
        }
        cur.updated_at = Utc::now();
        Ok(cur.clone())
    }

    async fn event_select_by_company(&self, company_id: Uuid) -> Result<Vec<AssessmentEvent>> {
        let mut events: Vec<_> = self
            .data()
            .events
            .iter()
            .filter(|e| e.company_id == company_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start_date);
        Ok(events)
    }

    async fn event_select_by_assessor(&self, assessor_id: Uuid) -> Result<Vec<AssessmentEvent>> {
        let data = self.data();
        let mut events: Vec<_> = data
            .events
            .iter()
            .filter(|e| {
                data.parts
                    .iter()
                    .any(|p| p.event_id == e.id && p.assessor_id == assessor_id)
            })
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start_date);
        Ok(events)
    }

    async fn event_select_by_assessee(&self, assessee_id: Uuid) -> Result<Vec<AssessmentEvent>> {
        let data = self.data();
        let mut events: Vec<_> = data
            .events
            .iter()
            .filter(|e| {
                data.parts
                    .iter()
                    .any(|p| p.event_id == e.id && p.assessee_id == assessee_id)
            })
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start_date);
        Ok(events)
    }
}

#[async_trait]
impl ParticipationsRepo for MemoryRepo {
    async fn participations_add(
        &self,
        event_id: Uuid,
        pairs: Vec<NewParticipation>,
        shells: &[AttemptShell],
    ) -> Result<Vec<Participation>> {
        let mut data = self.data();
        let mut created = Vec::new();
        for pair in pairs {
            let exists = data
                .parts
                .iter()
                .any(|p| p.event_id == event_id && p.assessee_id == pair.assessee_id);
            if exists {
                continue;
            }
            let now = Utc::now();
            let part = Participation {
                id: Uuid::new_v4(),
                event_id,
                assessee_id: pair.assessee_id,
                assessor_id: pair.assessor_id,
                created_at: now,
            };
            for shell in shells {
                data.attempts.push(ToolAttempt {
                    id: Uuid::new_v4(),
                    participation_id: part.id,
                    tool_id: shell.tool_id,
                    kind: shell.kind.as_str().to_string(),
                    submission: None,
                    grade: None,
                    note: None,
                    submitted_at: None,
                    created_at: now,
                    updated_at: now,
                });
            }
            data.parts.push(part.clone());
            created.push(part);
        }
        Ok(created)
    }

    async fn participation_try_load(&self, id: Uuid) -> Result<Option<Participation>> {
        Ok(self.data().parts.iter().find(|p| p.id == id).cloned())
    }

    async fn participation_find(
        &self,
        event_id: Uuid,
        assessee_id: Uuid,
    ) -> Result<Option<Participation>> {
        Ok(self
            .data()
            .parts
            .iter()
            .find(|p| p.event_id == event_id && p.assessee_id == assessee_id)
            .cloned())
    }

    async fn participation_select_by_event(&self, event_id: Uuid) -> Result<Vec<Participation>> {
        Ok(self
            .data()
            .parts
            .iter()
            .filter(|p| p.event_id == event_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttemptsRepo for MemoryRepo {
    async fn attempt_try_load(&self, id: Uuid) -> Result<Option<ToolAttempt>> {
        Ok(self.data().attempts.iter().find(|a| a.id == id).cloned())
    }

    async fn attempt_select_by_participation(
        &self,
        participation_id: Uuid,
    ) -> Result<Vec<ToolAttempt>> {
        Ok(self
            .data()
            .attempts
            .iter()
            .filter(|a| a.participation_id == participation_id)
            .cloned()
            .collect())
    }

    async fn attempt_grade(
        &self,
        id: Uuid,
        grade: Option<Decimal>,
        note: Option<String>,
    ) -> Result<ToolAttempt> {
        let mut data = self.data();
        let cur = data
            .attempts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::NotFound(format!("Tool attempt of id {} does not exist", id)))?;
        if grade.is_some() {
            cur.grade = grade;
        }
        if note.is_some() {
            cur.note = note;
        }
        cur.updated_at = Utc::now();
        Ok(cur.clone())
    }

    async fn attempt_submit(
        &self,
        id: Uuid,
        submission: JsonValue,
        at: DateTime<Utc>,
    ) -> Result<Option<ToolAttempt>> {
        let mut data = self.data();
        let cur = data
            .attempts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::NotFound(format!("Tool attempt of id {} does not exist", id)))?;
        if cur.submitted_at.is_some() {
            return Ok(None);
        }
        cur.submission = Some(submission);
        cur.submitted_at = Some(at);
        cur.updated_at = Utc::now();
        Ok(Some(cur.clone()))
    }

    async fn attempt_any_submitted(&self, event_id: Uuid) -> Result<bool> {
        let data = self.data();
        Ok(data.attempts.iter().any(|a| {
            a.submitted_at.is_some()
                && data
                    .parts
                    .iter()
                    .any(|p| p.id == a.participation_id && p.event_id == event_id)
        }))
    }
}

#[async_trait]
impl RoomsRepo for MemoryRepo {
    async fn room_get_or_create(&self, participation_id: Uuid) -> Result<VideoConferenceRoom> {
        let mut data = self.data();
        if let Some(room) = data.rooms.iter().find(|r| r.participation_id == participation_id) {
            return Ok(room.clone());
        }
        let room = VideoConferenceRoom {
            id: Uuid::new_v4(),
            participation_id,
            external_room_id: None,
            is_locked: false,
            roleplayer_ids: Vec::new(),
            created_at: Utc::now(),
        };
        data.rooms.push(room.clone());
        Ok(room)
    }

    async fn room_find_by_participation(
        &self,
        participation_id: Uuid,
    ) -> Result<Option<VideoConferenceRoom>> {
        Ok(self
            .data()
            .rooms
            .iter()
            .find(|r| r.participation_id == participation_id)
            .cloned())
    }

    async fn room_try_load(&self, id: Uuid) -> Result<Option<VideoConferenceRoom>> {
        Ok(self.data().rooms.iter().find(|r| r.id == id).cloned())
    }

    async fn room_attach_external(
        &self,
        id: Uuid,
        external_room_id: &str,
    ) -> Result<VideoConferenceRoom> {
        let mut data = self.data();
        let room = find_room(&mut data, id)?;
        if room.external_room_id.is_none() {
            room.external_room_id = Some(external_room_id.to_string());
        }
        Ok(room.clone())
    }

    async fn room_lock(&self, id: Uuid) -> Result<(VideoConferenceRoom, bool)> {
        let mut data = self.data();
        let room = find_room(&mut data, id)?;
        let newly_locked = !room.is_locked;
        room.is_locked = true;
        Ok((room.clone(), newly_locked))
    }

    async fn room_add_roleplayer(
        &self,
        id: Uuid,
        assessor_id: Uuid,
    ) -> Result<VideoConferenceRoom> {
        let mut data = self.data();
        let room = find_room(&mut data, id)?;
        if !room.roleplayer_ids.contains(&assessor_id) {
            room.roleplayer_ids.push(assessor_id);
        }
        Ok(room.clone())
    }
}

fn find_room(data: &mut Data, id: Uuid) -> Result<&mut VideoConferenceRoom> {
    data.rooms
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| Error::NotFound(format!("Video conference room of id {} does not exist", id)))
}
