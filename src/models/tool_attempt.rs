use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ToolAttempt {
    pub id: Uuid,
    pub participation_id: Uuid,
    pub tool_id: Uuid,
    pub kind: String,
    pub submission: Option<JsonValue>,
    pub grade: Option<Decimal>,
    pub note: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
