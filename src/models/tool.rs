use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentTool {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: ToolKind,
    pub created_at: DateTime<Utc>,
}

impl AssessmentTool {
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.kind.duration_minutes()))
    }
}

/// Closed set of tool variants; the `type` tag drives (de)serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolKind {
    Assignment {
        expected_file_format: String,
        duration_minutes: i32,
    },
    InteractiveQuiz {
        duration_minutes: i32,
        questions: Vec<QuizQuestion>,
    },
    ResponseTest {
        subject: String,
        prompt: String,
        sender: Option<String>,
        duration_minutes: i32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKindTag {
    Assignment,
    InteractiveQuiz,
    ResponseTest,
}

impl ToolKindTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKindTag::Assignment => "assignment",
            ToolKindTag::InteractiveQuiz => "interactive_quiz",
            ToolKindTag::ResponseTest => "response_test",
        }
    }
}

impl std::str::FromStr for ToolKindTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assignment" => Ok(ToolKindTag::Assignment),
            "interactive_quiz" => Ok(ToolKindTag::InteractiveQuiz),
            "response_test" => Ok(ToolKindTag::ResponseTest),
            other => Err(format!("unknown tool kind: {}", other)),
        }
    }
}

impl ToolKind {
    pub fn tag(&self) -> ToolKindTag {
        match self {
            ToolKind::Assignment { .. } => ToolKindTag::Assignment,
            ToolKind::InteractiveQuiz { .. } => ToolKindTag::InteractiveQuiz,
            ToolKind::ResponseTest { .. } => ToolKindTag::ResponseTest,
        }
    }

    pub fn duration_minutes(&self) -> i32 {
        match self {
            ToolKind::Assignment { duration_minutes, .. }
            | ToolKind::InteractiveQuiz { duration_minutes, .. }
            | ToolKind::ResponseTest { duration_minutes, .. } => *duration_minutes,
        }
    }

    /// What an assessee may see: quiz answer keys are stripped.
    pub fn assessee_view(&self) -> ToolKind {
        match self {
            ToolKind::InteractiveQuiz {
                duration_minutes,
                questions,
            } => ToolKind::InteractiveQuiz {
                duration_minutes: *duration_minutes,
                questions: questions.iter().map(QuizQuestion::without_answer).collect(),
            },
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuizQuestion {
    MultipleChoice {
        prompt: String,
        options: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correct_option: Option<usize>,
        points: i32,
    },
    Text {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        answer_key: Option<String>,
        points: i32,
    },
}

impl QuizQuestion {
    fn without_answer(&self) -> QuizQuestion {
        match self {
            QuizQuestion::MultipleChoice {
                prompt,
                options,
                points,
                ..
            } => QuizQuestion::MultipleChoice {
                prompt: prompt.clone(),
                options: options.clone(),
                correct_option: None,
                points: *points,
            },
            QuizQuestion::Text { prompt, points, .. } => QuizQuestion::Text {
                prompt: prompt.clone(),
                answer_key: None,
                points: *points,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_is_tagged_on_the_wire() {
        let kind: ToolKind = serde_json::from_value(json!({
            "type": "response_test",
            "subject": "Complaint",
            "prompt": "Reply to the customer",
            "sender": null,
            "duration_minutes": 30
        }))
        .unwrap();
        assert_eq!(kind.tag(), ToolKindTag::ResponseTest);
        assert_eq!(kind.duration_minutes(), 30);
    }

    #[test]
    fn assessee_view_hides_answer_keys() {
        let kind = ToolKind::InteractiveQuiz {
            duration_minutes: 10,
            questions: vec![
                QuizQuestion::MultipleChoice {
                    prompt: "2+2?".into(),
                    options: vec!["3".into(), "4".into()],
                    correct_option: Some(1),
                    points: 1,
                },
                QuizQuestion::Text {
                    prompt: "Why?".into(),
                    answer_key: Some("Because".into()),
                    points: 2,
                },
            ],
        };
        let view = serde_json::to_value(kind.assessee_view()).unwrap();
        assert!(view["questions"][0].get("correct_option").is_none());
        assert!(view["questions"][1].get("answer_key").is_none());
        assert_eq!(view["questions"][0]["options"][1], "4");
    }

    #[test]
    fn tag_round_trips_through_str() {
        for tag in [
            ToolKindTag::Assignment,
            ToolKindTag::InteractiveQuiz,
            ToolKindTag::ResponseTest,
        ] {
            assert_eq!(tag.as_str().parse::<ToolKindTag>().unwrap(), tag);
        }
    }
}
