use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::database::{NewTool, Repo};
use crate::dto::tool_dto::CreateToolPayload;
use crate::error::{Error, Result};
use crate::models::tool::{AssessmentTool, QuizQuestion, ToolKind};

#[derive(Clone)]
pub struct ToolService {
    repo: Arc<dyn Repo>,
}

impl ToolService {
    pub fn new(repo: Arc<dyn Repo>) -> Self {
        Self { repo }
    }

    pub async fn create_tool(&self, company_id: Uuid, payload: CreateToolPayload) -> Result<AssessmentTool> {
        payload.validate()?;
        validate_kind(&payload.kind)?;
        let tool = self
            .repo
            .tool_new(NewTool {
                company_id,
                name: payload.name.trim().to_string(),
                description: payload.description,
                kind: payload.kind,
            })
            .await?;
        tracing::info!(tool_id = %tool.id, kind = tool.kind.tag().as_str(), "assessment tool created");
        Ok(tool)
    }

    pub async fn list_tools(&self, company_id: Uuid) -> Result<Vec<AssessmentTool>> {
        self.repo.tool_select_by_company(company_id).await
    }

    pub async fn get_tool(&self, id: Uuid, company_id: Uuid) -> Result<AssessmentTool> {
        match self.repo.tool_try_load(id).await? {
            Some(tool) if tool.company_id == company_id => Ok(tool),
            _ => Err(Error::NotFound(format!("Tool of id {} does not exist", id))),
        }
    }
}

fn validate_kind(kind: &ToolKind) -> Result<()> {
    if kind.duration_minutes() < 1 {
        return Err(Error::BadRequest(
            "Tool duration must be at least one minute".to_string(),
        ));
    }
    match kind {
        ToolKind::Assignment {
            expected_file_format,
            ..
        } if expected_file_format.trim().is_empty() => Err(Error::BadRequest(
            "Assignment must declare an expected file format".to_string(),
        )),
        ToolKind::ResponseTest { subject, prompt, .. }
            if subject.trim().is_empty() || prompt.trim().is_empty() =>
        {
            Err(Error::BadRequest(
                "Response test must have a subject and a prompt".to_string(),
            ))
        }
        ToolKind::InteractiveQuiz { questions, .. } => {
            questions.iter().enumerate().try_for_each(|(idx, q)| validate_question(idx, q))
        }
        _ => Ok(()),
    }
}

fn validate_question(idx: usize, question: &QuizQuestion) -> Result<()> {
    let (prompt, points) = match question {
        QuizQuestion::MultipleChoice {
            prompt,
            options,
            correct_option,
            points,
        } => {
            if options.len() < 2 {
                return Err(Error::BadRequest(format!(
                    "Question {} must have at least two options",
                    idx + 1
                )));
            }
            if !matches!(correct_option, Some(i) if *i < options.len()) {
                return Err(Error::BadRequest(format!(
                    "Question {} must mark one of its options as correct",
                    idx + 1
                )));
            }
            (prompt, *points)
        }
        QuizQuestion::Text { prompt, points, .. } => (prompt, *points),
    };
    if prompt.trim().is_empty() {
        return Err(Error::BadRequest(format!("Question {} has no prompt", idx + 1)));
    }
    if points < 0 {
        return Err(Error::BadRequest(format!(
            "Question {} must not be worth negative points",
            idx + 1
        )));
    }
    Ok(())
}
