use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::tool_dto::ToolResponse;
use crate::models::test_flow::TestFlow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTestFlowPayload {
    pub name: String,
    #[serde(default)]
    pub tools: Vec<TestFlowToolPayload>,
}

/// Times are ISO-8601 date-times; only their time of day is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestFlowToolPayload {
    pub tool_id: Uuid,
    pub release_time: String,
    pub start_working_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestFlowResponse {
    pub id: Uuid,
    pub name: String,
    pub is_usable: bool,
    pub tools: Vec<TestFlowToolResponse>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestFlowToolResponse {
    pub tool: ToolResponse,
    pub release_time: NaiveTime,
    pub start_working_time: NaiveTime,
}

impl From<TestFlow> for TestFlowResponse {
    fn from(flow: TestFlow) -> Self {
        Self {
            id: flow.id,
            is_usable: flow.is_usable(),
            name: flow.name,
            tools: flow
                .tools
                .into_iter()
                .map(|entry| TestFlowToolResponse {
                    tool: entry.tool.into(),
                    release_time: entry.release_time,
                    start_working_time: entry.start_working_time,
                })
                .collect(),
            created_at: flow.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestFlowListResponse {
    pub items: Vec<TestFlowResponse>,
}
