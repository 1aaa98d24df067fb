mod memory;
mod pg;

pub use memory::MemoryRepo;
pub use pg::PgRepo;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    event::AssessmentEvent,
    participation::Participation,
    test_flow::TestFlow,
    tool::{AssessmentTool, ToolKind, ToolKindTag},
    tool_attempt::ToolAttempt,
    user::{Assessee, Assessor, Company},
    video_conference::VideoConferenceRoom,
};

#[derive(Debug, Clone)]
pub struct NewTool {
    pub company_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub kind: ToolKind,
}

#[derive(Debug, Clone)]
pub struct NewFlowEntry {
    pub tool_id: Uuid,
    pub release_time: NaiveTime,
    pub start_working_time: NaiveTime,
}

/// Entries are stored in the given order.
#[derive(Debug, Clone)]
pub struct NewTestFlow {
    pub company_id: Uuid,
    pub name: String,
    pub entries: Vec<NewFlowEntry>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub company_id: Uuid,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub test_flow_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub test_flow_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewParticipation {
    pub assessee_id: Uuid,
    pub assessor_id: Uuid,
}

/// Empty attempt created for each tool when a participant joins.
#[derive(Debug, Clone, Copy)]
pub struct AttemptShell {
    pub tool_id: Uuid,
    pub kind: ToolKindTag,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn company_try_load(&self, id: Uuid) -> Result<Option<Company>>;
    async fn company_try_load_by_email(&self, email: &str) -> Result<Option<Company>>;
    async fn assessor_try_load(&self, id: Uuid) -> Result<Option<Assessor>>;
    async fn assessor_try_load_by_email(&self, email: &str) -> Result<Option<Assessor>>;
    async fn assessee_try_load(&self, id: Uuid) -> Result<Option<Assessee>>;
    async fn assessee_try_load_by_email(&self, email: &str) -> Result<Option<Assessee>>;
}

#[async_trait]
pub trait ToolsRepo: Send + Sync {
    async fn tool_new(&self, tool: NewTool) -> Result<AssessmentTool>;
    async fn tool_try_load(&self, id: Uuid) -> Result<Option<AssessmentTool>>;
    async fn tool_select_by_company(&self, company_id: Uuid) -> Result<Vec<AssessmentTool>>;
}

#[async_trait]
pub trait FlowsRepo: Send + Sync {
    /// Creates the flow and attaches every entry in one unit: either all
    /// entries are attached or nothing is stored.
    async fn flow_new(&self, flow: NewTestFlow) -> Result<TestFlow>;
    async fn flow_try_load(&self, id: Uuid) -> Result<Option<TestFlow>>;
    async fn flow_select_by_company(&self, company_id: Uuid) -> Result<Vec<TestFlow>>;
}

#[async_trait]
pub trait EventsRepo: Send + Sync {
    async fn event_new(&self, event: NewEvent) -> Result<AssessmentEvent>;
    async fn event_try_load(&self, id: Uuid) -> Result<Option<AssessmentEvent>>;
    async fn event_update(&self, id: Uuid, patch: EventPatch) -> Result<AssessmentEvent>;
    async fn event_select_by_company(&self, company_id: Uuid) -> Result<Vec<AssessmentEvent>>;
    async fn event_select_by_assessor(&self, assessor_id: Uuid) -> Result<Vec<AssessmentEvent>>;
    async fn event_select_by_assessee(&self, assessee_id: Uuid) -> Result<Vec<AssessmentEvent>>;
}

#[async_trait]
pub trait ParticipationsRepo: Send + Sync {
    /// Adds every pair whose assessee is not yet in the event, creating an
    /// attempt shell per tool for each new participation. Returns only the
    /// newly created participations. Atomic for the whole batch.
    async fn participations_add(
        &self,
        event_id: Uuid,
        pairs: Vec<NewParticipation>,
        shells: &[AttemptShell],
    ) -> Result<Vec<Participation>>;
    async fn participation_try_load(&self, id: Uuid) -> Result<Option<Participation>>;
    async fn participation_find(
        &self,
        event_id: Uuid,
        assessee_id: Uuid,
    ) -> Result<Option<Participation>>;
    async fn participation_select_by_event(&self, event_id: Uuid) -> Result<Vec<Participation>>;
}

#[async_trait]
pub trait AttemptsRepo: Send + Sync {
    async fn attempt_try_load(&self, id: Uuid) -> Result<Option<ToolAttempt>>;
    async fn attempt_select_by_participation(
        &self,
        participation_id: Uuid,
    ) -> Result<Vec<ToolAttempt>>;
    /// Merges: a `None` field keeps the stored value.
    async fn attempt_grade(
        &self,
        id: Uuid,
        grade: Option<Decimal>,
        note: Option<String>,
    ) -> Result<ToolAttempt>;
    /// Returns `None` if the attempt was already submitted.
    async fn attempt_submit(
        &self,
        id: Uuid,
        submission: JsonValue,
        at: DateTime<Utc>,
    ) -> Result<Option<ToolAttempt>>;
    async fn attempt_any_submitted(&self, event_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait RoomsRepo: Send + Sync {
    async fn room_get_or_create(&self, participation_id: Uuid) -> Result<VideoConferenceRoom>;
    async fn room_find_by_participation(
        &self,
        participation_id: Uuid,
    ) -> Result<Option<VideoConferenceRoom>>;
    async fn room_try_load(&self, id: Uuid) -> Result<Option<VideoConferenceRoom>>;
    /// Keeps an already attached id; the returned room carries the winner.
    async fn room_attach_external(
        &self,
        id: Uuid,
        external_room_id: &str,
    ) -> Result<VideoConferenceRoom>;
    /// Returns the room and whether this call was the one that locked it.
    async fn room_lock(&self, id: Uuid) -> Result<(VideoConferenceRoom, bool)>;
    async fn room_add_roleplayer(&self, id: Uuid, assessor_id: Uuid)
        -> Result<VideoConferenceRoom>;
}

pub trait Repo:
    UsersRepo + ToolsRepo + FlowsRepo + EventsRepo + ParticipationsRepo + AttemptsRepo + RoomsRepo
{
}

impl<T> Repo for T where
    T: UsersRepo
        + ToolsRepo
        + FlowsRepo
        + EventsRepo
        + ParticipationsRepo
        + AttemptsRepo
        + RoomsRepo
{
}
