use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct VideoConferenceRoom {
    pub id: Uuid,
    pub participation_id: Uuid,
    pub external_room_id: Option<String>,
    pub is_locked: bool,
    #[sqlx(skip)]
    pub roleplayer_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}
