use std::sync::Arc;

use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::database::Repo;
use crate::dto::attempt_dto::AttemptResponse;
use crate::error::{Error, Result};
use crate::models::tool::ToolKind;
use crate::models::tool_attempt::ToolAttempt;
use crate::models::user::Assessee;
use crate::services::event_service::EventService;
use crate::services::grading_service::GradingService;
use crate::services::participation_service::ParticipationService;

#[derive(Clone)]
pub struct AttemptService {
    repo: Arc<dyn Repo>,
    events: EventService,
    participations: ParticipationService,
}

impl AttemptService {
    pub fn new(repo: Arc<dyn Repo>, events: EventService, participations: ParticipationService) -> Self {
        Self {
            repo,
            events,
            participations,
        }
    }

    /// Stores the assessee's work for one tool. Accepted once, while the
    /// event runs and after the tool's start-working instant.
    pub async fn submit_attempt(
        &self,
        event_id: Uuid,
        tool_id: Uuid,
        assessee: &Assessee,
        submission: JsonValue,
    ) -> Result<ToolAttempt> {
        let event = self
            .events
            .load_event(event_id)
            .await
            .map_err(Error::into_invalid_request)?;
        let part = self
            .participations
            .require_participation(event.id, assessee.id)
            .await?;
        let clock = self.events.clock_for(&event).await?;
        let now = self.events.now();
        if !clock.is_active(now) {
            return Err(Error::BadRequest(format!(
                "Assessment event of id {} is not in progress",
                event.id
            )));
        }
        let scheduled = clock.find(tool_id).ok_or_else(|| {
            Error::BadRequest(format!(
                "Tool of id {} is not part of assessment event {}",
                tool_id, event.id
            ))
        })?;
        if now < scheduled.start_working_at {
            return Err(Error::BadRequest(format!(
                "Tool of id {} is not open for submissions before {}",
                tool_id,
                scheduled.start_working_at.to_rfc3339()
            )));
        }

        let attempt = self
            .repo
            .attempt_select_by_participation(part.id)
            .await?
            .into_iter()
            .find(|a| a.tool_id == tool_id)
            .ok_or_else(|| {
                Error::Internal(format!(
                    "Participation {} has no attempt for tool {}",
                    part.id, tool_id
                ))
            })?;
        let submitted = self
            .repo
            .attempt_submit(attempt.id, submission, now)
            .await?
            .ok_or_else(|| {
                Error::BadRequest("The tool attempt has already been submitted.".to_string())
            })?;
        tracing::info!(
            attempt_id = %submitted.id,
            event_id = %event.id,
            assessee_id = %assessee.id,
            "tool attempt submitted"
        );
        Ok(submitted)
    }

    /// Grading view of one assessee's attempts, for their paired assessor.
    pub async fn list_attempts(
        &self,
        event_id: Uuid,
        assessee_id: Uuid,
        assessor_id: Uuid,
    ) -> Result<Vec<AttemptResponse>> {
        let event = self.events.load_event(event_id).await?;
        if !self
            .participations
            .check_pair_responsibility(event.id, assessee_id, assessor_id)
            .await?
        {
            return Err(Error::Unauthorized(format!(
                "You are not the assessor responsible for assessee {} in assessment event {}",
                assessee_id, event_id
            )));
        }
        let part = self.participations.require_participation(event.id, assessee_id).await?;
        let clock = self.events.clock_for(&event).await?;

        let mut rows = Vec::new();
        for attempt in self.repo.attempt_select_by_participation(part.id).await? {
            let tool = clock.find(attempt.tool_id).map(|s| &s.tool);
            let auto_score = match (tool.map(|t| &t.kind), &attempt.submission) {
                (Some(ToolKind::InteractiveQuiz { questions, .. }), Some(submission)) => {
                    Some(GradingService::score_quiz(questions, submission))
                }
                _ => None,
            };
            let name = tool.map(|t| t.name.clone());
            rows.push(AttemptResponse::new(attempt, name, auto_score));
        }
        // Flow order.
        rows.sort_by_key(|r| {
            clock
                .schedule()
                .iter()
                .position(|s| s.tool.id == r.tool_id)
                .unwrap_or(usize::MAX)
        });
        Ok(rows)
    }
}
