use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::participation::Participation;
use crate::models::user::Assessee;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddParticipantsPayload {
    #[validate(length(min = 1, message = "At least one participant must be provided."))]
    pub participants: Vec<ParticipantPair>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantPair {
    pub assessee_email: String,
    pub assessor_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddParticipantsResponse {
    pub added: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantResponse {
    pub participation_id: Uuid,
    pub assessee_id: Uuid,
    pub assessee_email: String,
    pub assessee_name: String,
    pub assessor_id: Uuid,
    pub joined_at: DateTime<Utc>,
}

impl ParticipantResponse {
    pub fn new(part: Participation, assessee: Assessee) -> Self {
        Self {
            participation_id: part.id,
            assessee_id: assessee.id,
            assessee_email: assessee.email,
            assessee_name: format!("{} {}", assessee.first_name, assessee.last_name),
            assessor_id: part.assessor_id,
            joined_at: part.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantListResponse {
    pub items: Vec<ParticipantResponse>,
}
