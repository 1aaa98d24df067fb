use std::sync::Arc;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::database::Repo;
use crate::dto::attempt_dto::{GradeAttemptPayload, QuizScore};
use crate::error::{Error, Result};
use crate::models::tool::QuizQuestion;
use crate::models::tool_attempt::ToolAttempt;
use crate::services::participation_service::ParticipationService;

#[derive(Clone)]
pub struct GradingService {
    repo: Arc<dyn Repo>,
    participations: ParticipationService,
}

impl GradingService {
    pub fn new(repo: Arc<dyn Repo>, participations: ParticipationService) -> Self {
        Self {
            repo,
            participations,
        }
    }

    /// Pairing is checked before the values, so an unpaired assessor is
    /// refused whatever they send. Omitted fields keep their stored value.
    pub async fn record_grade(
        &self,
        attempt_id: Uuid,
        event_id: Uuid,
        assessor_id: Uuid,
        payload: GradeAttemptPayload,
    ) -> Result<ToolAttempt> {
        let attempt = self
            .repo
            .attempt_try_load(attempt_id)
            .await?
            .ok_or_else(|| {
                Error::BadRequest(format!("Tool attempt of id {} does not exist", attempt_id))
            })?;
        let part = self
            .repo
            .participation_try_load(attempt.participation_id)
            .await?
            .filter(|p| p.event_id == event_id)
            .ok_or_else(|| {
                Error::BadRequest(format!(
                    "Tool attempt of id {} does not belong to assessment event {}",
                    attempt_id, event_id
                ))
            })?;
        if !self
            .participations
            .check_pair_responsibility(event_id, part.assessee_id, assessor_id)
            .await?
        {
            return Err(Error::Unauthorized(format!(
                "You are not the assessor responsible for assessee {} in assessment event {}",
                part.assessee_id, event_id
            )));
        }

        let grade = parse_grade(payload.grade)?;
        let note = parse_note(payload.note)?;
        let graded = self.repo.attempt_grade(attempt.id, grade, note).await?;
        tracing::info!(
            attempt_id = %graded.id,
            %event_id,
            %assessor_id,
            grade = ?graded.grade,
            "tool attempt graded"
        );
        Ok(graded)
    }

    /// Scores the multiple-choice part of a quiz submission. The submission
    /// carries `answers`, one entry per question in order; a choice is either
    /// the option index or `{"selected": index}`. Text answers need review.
    pub fn score_quiz(questions: &[QuizQuestion], submission: &JsonValue) -> QuizScore {
        let answers = submission
            .get("answers")
            .and_then(|a| a.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut score = QuizScore {
            earned: 0,
            max: 0,
            needs_review: false,
        };
        for (idx, question) in questions.iter().enumerate() {
            let answer = answers.get(idx).unwrap_or(&JsonValue::Null);
            match question {
                QuizQuestion::MultipleChoice {
                    correct_option,
                    points,
                    ..
                } => {
                    score.max += points;
                    let given = answer
                        .as_u64()
                        .or_else(|| answer.get("selected").and_then(|v| v.as_u64()));
                    match (given, correct_option) {
                        (Some(given), Some(correct)) if given as usize == *correct => {
                            score.earned += points;
                        }
                        (_, None) => score.needs_review = true,
                        _ => {}
                    }
                }
                QuizQuestion::Text { points, .. } => {
                    score.max += points;
                    score.needs_review = true;
                }
            }
        }
        score
    }
}

fn parse_grade(raw: Option<JsonValue>) -> Result<Option<Decimal>> {
    let invalid = || Error::BadRequest("The grade must be a number.".to_string());
    match raw {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(Decimal::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Some(Decimal::from(u)))
            } else {
                n.as_f64().and_then(Decimal::from_f64).map(Some).ok_or_else(invalid)
            }
        }
        Some(_) => Err(invalid()),
    }
}

fn parse_note(raw: Option<JsonValue>) -> Result<Option<String>> {
    match raw {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s)),
        Some(_) => Err(Error::BadRequest("The note must be text.".to_string())),
    }
}
