use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ids::EntityId;
use crate::models::quiz::Answer;

/// A finished run through a quiz. Immutable once handed to persistence.
///
/// Serialized in the shape the local history has always used
/// (`{id, quizId, score, answers, timeSpent, completedAt, passed}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: Uuid,
    pub user_id: EntityId,
    pub quiz_id: EntityId,
    /// Question id -> chosen answer. Unanswered questions have no entry.
    pub answers: BTreeMap<EntityId, Answer>,
    /// Seconds between start and submission.
    pub time_spent: u64,
    pub score: u8,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub auto_submit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}
