use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::ids::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerKind {
    MultipleChoice,
    TrueFalse,
}

/// A user's (or the key's) answer: an option index or a true/false flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Choice(usize),
    Flag(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    /// Backend difficulty levels are 1..=3; anything above 3 is treated as advanced.
    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            i64::MIN..=0 => None,
            1 => Some(Difficulty::Beginner),
            2 => Some(Difficulty::Intermediate),
            _ => Some(Difficulty::Advanced),
        }
    }

    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "beginner" | "easy" => Some(Difficulty::Beginner),
            "intermediate" | "medium" => Some(Difficulty::Intermediate),
            "advanced" | "hard" => Some(Difficulty::Advanced),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: EntityId,
    pub prompt: String,
    pub scenario: Option<String>,
    pub kind: AnswerKind,
    /// Option texts, in display order. Empty for true/false questions.
    pub options: Vec<String>,
    /// `None` when the source withholds the key (backend quizzes are scored server-side).
    pub correct: Option<Answer>,
    pub explanation: Option<String>,
}

impl Question {
    /// Whether `answer` is a well-formed answer for this question.
    pub fn accepts(&self, answer: &Answer) -> bool {
        match (self.kind, answer) {
            (AnswerKind::MultipleChoice, Answer::Choice(index)) => *index < self.options.len(),
            (AnswerKind::TrueFalse, Answer::Flag(_)) => true,
            _ => false,
        }
    }

    /// Human-readable text of an answer; this is also what the backend matches against.
    pub fn answer_text(&self, answer: &Answer) -> Option<String> {
        match answer {
            Answer::Choice(index) => self.options.get(*index).cloned(),
            Answer::Flag(true) => Some("True".to_string()),
            Answer::Flag(false) => Some("False".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quiz {
    pub id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: u32,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub tags: Vec<String>,
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn duration_secs(&self) -> u32 {
        self.duration_minutes.saturating_mul(60)
    }

    pub fn question(&self, id: &EntityId) -> Option<&Question> {
        self.questions.iter().find(|q| &q.id == id)
    }

    pub fn correct_answers(&self) -> Vec<Option<Answer>> {
        self.questions.iter().map(|q| q.correct).collect()
    }
}

/// Catalog entry: what the quiz list shows before a quiz is opened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizSummary {
    pub id: EntityId,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: u32,
    pub question_count: usize,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub tags: Vec<String>,
}

impl From<&Quiz> for QuizSummary {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id.clone(),
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            duration_minutes: quiz.duration_minutes,
            question_count: quiz.questions.len(),
            category: quiz.category.clone(),
            difficulty: quiz.difficulty,
            tags: quiz.tags.clone(),
        }
    }
}
