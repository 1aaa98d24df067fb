use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Participation {
    pub id: Uuid,
    pub event_id: Uuid,
    pub assessee_id: Uuid,
    pub assessor_id: Uuid,
    pub created_at: DateTime<Utc>,
}
