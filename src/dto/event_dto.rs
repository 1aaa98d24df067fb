use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::event::{AssessmentEvent, EventState};
use crate::services::event_clock::EventClock;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateEventPayload {
    pub name: Option<String>,
    pub start_date: Option<String>,
    pub test_flow_id: Option<Uuid>,
}

/// Omitted fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventPayload {
    pub name: Option<String>,
    pub start_date: Option<String>,
    pub test_flow_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub test_flow_id: Uuid,
    pub state: EventState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventResponse {
    pub fn new(event: AssessmentEvent, clock: &EventClock, now: DateTime<Utc>) -> Self {
        Self {
            id: event.id,
            name: event.name,
            start_date: event.start_date,
            end_date: clock.end(),
            test_flow_id: event.test_flow_id,
            state: clock.state(now),
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventListResponse {
    pub items: Vec<EventResponse>,
}
