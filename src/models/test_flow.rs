use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::tool::AssessmentTool;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestFlow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    /// Sorted by release time; this is the progression order.
    pub tools: Vec<TestFlowTool>,
    pub created_at: DateTime<Utc>,
}

impl TestFlow {
    pub fn is_usable(&self) -> bool {
        !self.tools.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestFlowTool {
    pub tool: AssessmentTool,
    pub release_time: NaiveTime,
    pub start_working_time: NaiveTime,
}
