use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::tool_attempt::ToolAttempt;

/// Both fields stay loosely typed so a wrong type is reported with a
/// readable message instead of a deserializer error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradeAttemptPayload {
    #[serde(default)]
    pub grade: Option<JsonValue>,
    #[serde(default)]
    pub note: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAttemptPayload {
    pub submission: JsonValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizScore {
    pub earned: i32,
    pub max: i32,
    pub needs_review: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptResponse {
    pub id: Uuid,
    pub tool_id: Uuid,
    pub tool_name: Option<String>,
    pub kind: String,
    pub submission: Option<JsonValue>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub grade: Option<Decimal>,
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_score: Option<QuizScore>,
    pub updated_at: DateTime<Utc>,
}

impl AttemptResponse {
    pub fn new(attempt: ToolAttempt, tool_name: Option<String>, auto_score: Option<QuizScore>) -> Self {
        Self {
            id: attempt.id,
            tool_id: attempt.tool_id,
            tool_name,
            kind: attempt.kind,
            submission: attempt.submission,
            submitted_at: attempt.submitted_at,
            grade: attempt.grade,
            note: attempt.note,
            auto_score,
            updated_at: attempt.updated_at,
        }
    }
}

impl From<ToolAttempt> for AttemptResponse {
    fn from(attempt: ToolAttempt) -> Self {
        Self::new(attempt, None, None)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttemptListResponse {
    pub items: Vec<AttemptResponse>,
}
