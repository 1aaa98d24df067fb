use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::tool::ToolKind;
use crate::services::event_clock::ScheduledTool;

/// One frame of the live release stream. The first frame of every
/// subscription carries no payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseMessage {
    pub id: String,
    pub payload: Option<ReleasedTool>,
}

impl ReleaseMessage {
    pub fn begin() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payload: None,
        }
    }

    pub fn release(tool: ReleasedTool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payload: Some(tool),
        }
    }

    pub fn is_begin(&self) -> bool {
        self.payload.is_none()
    }
}

/// Tool as the assessee sees it: answer keys stripped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleasedTool {
    pub tool_id: Uuid,
    pub attempt_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: ToolKind,
    pub release_at: DateTime<Utc>,
    pub start_working_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

impl ReleasedTool {
    pub fn new(scheduled: &ScheduledTool, attempt_id: Option<Uuid>) -> Self {
        Self {
            tool_id: scheduled.tool.id,
            attempt_id,
            name: scheduled.tool.name.clone(),
            description: scheduled.tool.description.clone(),
            kind: scheduled.tool.kind.assessee_view(),
            release_at: scheduled.release_at,
            start_working_at: scheduled.start_working_at,
            due_at: scheduled.due_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReleasedToolListResponse {
    pub items: Vec<ReleasedTool>,
}
