use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::tool::{AssessmentTool, ToolKind};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateToolPayload {
    #[validate(length(min = 1, max = 50), custom(function = "crate::utils::validation::not_blank"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: ToolKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: ToolKind,
    pub created_at: DateTime<Utc>,
}

impl From<AssessmentTool> for ToolResponse {
    fn from(tool: AssessmentTool) -> Self {
        Self {
            id: tool.id,
            name: tool.name,
            description: tool.description,
            kind: tool.kind,
            created_at: tool.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolListResponse {
    pub items: Vec<ToolResponse>,
}
