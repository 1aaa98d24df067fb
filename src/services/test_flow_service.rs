use std::sync::Arc;

use uuid::Uuid;

use crate::database::{NewFlowEntry, NewTestFlow, Repo};
use crate::dto::test_flow_dto::{CreateTestFlowPayload, TestFlowToolPayload};
use crate::error::{Error, Result};
use crate::models::test_flow::TestFlow;
use crate::utils::time::parse_time_of_day;
use crate::utils::validation::char_len;

pub const MAX_FLOW_NAME_LEN: usize = 50;

#[derive(Clone)]
pub struct TestFlowService {
    repo: Arc<dyn Repo>,
}

impl TestFlowService {
    pub fn new(repo: Arc<dyn Repo>) -> Self {
        Self { repo }
    }

    /// Validates every entry before anything is written, then stores the
    /// flow and its entries as one unit, ordered by release time.
    pub async fn create_flow(&self, company_id: Uuid, payload: CreateTestFlowPayload) -> Result<TestFlow> {
        let name = validate_flow_name(&payload.name)?;

        let mut entries = Vec::with_capacity(payload.tools.len());
        for entry in &payload.tools {
            entries.push(self.resolve_entry(company_id, entry).await?);
        }
        // Stable: equal release times keep their input order.
        entries.sort_by_key(|e| e.release_time);

        let flow = self
            .repo
            .flow_new(NewTestFlow {
                company_id,
                name,
                entries,
            })
            .await?;
        tracing::info!(
            flow_id = %flow.id,
            tools = flow.tools.len(),
            usable = flow.is_usable(),
            "test flow created"
        );
        Ok(flow)
    }

    pub async fn get_flow(&self, id: Uuid, company_id: Uuid) -> Result<TestFlow> {
        match self.repo.flow_try_load(id).await? {
            Some(flow) if flow.company_id == company_id => Ok(flow),
            _ => Err(Error::NotFound(format!("Test flow of id {} does not exist", id))),
        }
    }

    pub async fn list_flows(&self, company_id: Uuid) -> Result<Vec<TestFlow>> {
        self.repo.flow_select_by_company(company_id).await
    }

    async fn resolve_entry(&self, company_id: Uuid, entry: &TestFlowToolPayload) -> Result<NewFlowEntry> {
        match self.repo.tool_try_load(entry.tool_id).await? {
            Some(tool) if tool.company_id == company_id => {}
            _ => {
                return Err(Error::NotFound(format!(
                    "Tool of id {} does not exist",
                    entry.tool_id
                ))
                .into_invalid_request())
            }
        }
        let release_time = parse_time_of_day(&entry.release_time).ok_or_else(|| {
            Error::BadRequest(format!(
                "Release time of tool {} must be an ISO-8601 date-time",
                entry.tool_id
            ))
        })?;
        let start_working_time = parse_time_of_day(&entry.start_working_time).ok_or_else(|| {
            Error::BadRequest(format!(
                "Start working time of tool {} must be an ISO-8601 date-time",
                entry.tool_id
            ))
        })?;
        Ok(NewFlowEntry {
            tool_id: entry.tool_id,
            release_time,
            start_working_time,
        })
    }
}

fn validate_flow_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::BadRequest("Test flow name must not be empty".to_string()));
    }
    if char_len(name) > MAX_FLOW_NAME_LEN {
        return Err(Error::BadRequest(format!(
            "Test flow name must not exceed {} characters",
            MAX_FLOW_NAME_LEN
        )));
    }
    Ok(name.to_string())
}
