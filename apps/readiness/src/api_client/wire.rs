//! Request/response bodies exchanged with the backend, plus conversion into domain models.
//!
//! The bundled quiz library uses the same quiz shape, so both sources go through
//! [`WireQuiz::into_quiz`].

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{Answer, AnswerKind, Difficulty, EntityId, Question, Quiz, QuizSummary, User};

/// Used when a quiz arrives without a time limit.
pub const DEFAULT_DURATION_MINUTES: u32 = 15;

#[derive(Debug, Deserialize)]
pub struct WireQuiz {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "estimatedTime", alias = "time_limit_minutes")]
    pub duration: Option<u32>,
    #[serde(default, alias = "specialization_name")]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<WireDifficulty>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub question_count: Option<usize>,
    #[serde(default)]
    pub questions: Vec<WireQuestion>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireDifficulty {
    Level(i64),
    Label(String),
}

impl WireDifficulty {
    fn resolve(&self) -> Option<Difficulty> {
        match self {
            WireDifficulty::Level(level) => Difficulty::from_level(*level),
            WireDifficulty::Label(label) => Difficulty::parse_label(label),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireQuestion {
    pub id: EntityId,
    #[serde(alias = "question_text", alias = "prompt")]
    pub question: String,
    #[serde(default)]
    pub scenario: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub options: Vec<WireOption>,
    #[serde(default)]
    pub correct_index: Option<usize>,
    #[serde(default)]
    pub correct: Option<Answer>,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Options come either as bare strings or as `{text, is_correct}` records.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireOption {
    Text(String),
    Flagged {
        #[serde(alias = "option_text")]
        text: String,
        #[serde(default)]
        is_correct: bool,
    },
}

impl WireOption {
    fn is_correct(&self) -> bool {
        matches!(self, WireOption::Flagged { is_correct: true, .. })
    }

    fn into_text(self) -> String {
        match self {
            WireOption::Text(text) | WireOption::Flagged { text, .. } => text,
        }
    }
}

impl WireQuestion {
    pub fn into_question(self) -> Question {
        let kind = match self.kind.as_deref() {
            Some("true-false" | "true_false" | "boolean") => AnswerKind::TrueFalse,
            Some(_) => AnswerKind::MultipleChoice,
            None if self.options.is_empty() => AnswerKind::TrueFalse,
            None => AnswerKind::MultipleChoice,
        };

        let flagged = self.options.iter().position(WireOption::is_correct);
        let options: Vec<String> = self.options.into_iter().map(WireOption::into_text).collect();

        let correct = match kind {
            AnswerKind::MultipleChoice => self
                .correct_index
                .or(flagged)
                .or(match self.correct {
                    Some(Answer::Choice(index)) => Some(index),
                    _ => None,
                })
                .filter(|index| {
                    let in_range = *index < options.len();
                    if !in_range {
                        warn!("Question {} has out-of-range correct index {index}", self.id);
                    }
                    in_range
                })
                .map(Answer::Choice),
            AnswerKind::TrueFalse => self.correct.filter(|a| matches!(a, Answer::Flag(_))),
        };

        Question {
            id: self.id,
            prompt: self.question,
            scenario: self.scenario,
            kind,
            options,
            correct,
            explanation: self.explanation,
        }
    }
}

impl WireQuiz {
    pub fn into_quiz(self) -> Quiz {
        Quiz {
            id: self.id,
            title: self.title,
            description: self.description,
            duration_minutes: self.duration.unwrap_or(DEFAULT_DURATION_MINUTES),
            category: self.category,
            difficulty: self.difficulty.as_ref().and_then(WireDifficulty::resolve),
            tags: self.tags,
            questions: self
                .questions
                .into_iter()
                .map(WireQuestion::into_question)
                .collect(),
        }
    }

    pub fn into_summary(self) -> QuizSummary {
        QuizSummary {
            question_count: self.question_count.unwrap_or(self.questions.len()),
            id: self.id,
            title: self.title,
            description: self.description,
            duration_minutes: self.duration.unwrap_or(DEFAULT_DURATION_MINUTES),
            category: self.category,
            difficulty: self.difficulty.as_ref().and_then(WireDifficulty::resolve),
            tags: self.tags,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum QuizListResponse {
    Wrapped { quizzes: Vec<WireQuiz> },
    Bare(Vec<WireQuiz>),
}

impl QuizListResponse {
    pub fn into_inner(self) -> Vec<WireQuiz> {
        match self {
            QuizListResponse::Wrapped { quizzes } | QuizListResponse::Bare(quizzes) => quizzes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Serialize)]
pub struct UpdateSpecializationRequest<'a> {
    pub specialization_id: &'a EntityId,
}

#[derive(Debug, Deserialize)]
pub struct StartResponse {
    pub attempt_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitRequest {
    pub answers: Vec<AnswerPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerPayload {
    pub question_id: EntityId,
    /// Option text (or `"True"`/`"False"`); empty for unanswered questions.
    pub selected_answer: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    pub score: f64,
    pub correct: usize,
    pub total: usize,
    pub passed: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: serde_json::Value,
}
