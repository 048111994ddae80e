use serde::{Deserialize, Serialize};

use crate::models::ids::EntityId;

/// The signed-in user as returned by register/login and kept in the local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub specialization_id: Option<EntityId>,
    #[serde(default)]
    pub readiness_score: Option<f64>,
    #[serde(default)]
    pub technical_score: Option<f64>,
    #[serde(default)]
    pub soft_skills_score: Option<f64>,
    /// Backend timestamp, kept verbatim (it is not always RFC 3339).
    #[serde(default)]
    pub created_at: Option<String>,
}
