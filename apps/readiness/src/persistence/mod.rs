//! Attempt persistence behind a single fallback policy.
//!
//! `RemoteAttemptStore` talks to the backend, `LocalAttemptStore` writes to the local
//! store. `FallbackPersister` tries them in that order and never fails: whatever
//! happens, the caller gets an outcome carrying at least the locally computed score.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::api_client::ApiError;
use crate::models::{Attempt, Quiz};
use crate::quiz::scoring;
use crate::store::StoreError;

pub mod local;
pub mod remote;

pub use local::LocalAttemptStore;
pub use remote::RemoteAttemptStore;

pub const STORED_LOCALLY_WARNING: &str = "Stored locally. Backend not available.";
pub const HISTORY_NOT_UPDATED_WARNING: &str =
    "Result saved, but it could not be added to the history on this device.";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeSource {
    Backend,
    Local,
    NotStored,
}

/// What a store reports back for a persisted attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredOutcome {
    pub score: u8,
    pub correct_count: usize,
    pub total: usize,
    pub passed: bool,
}

impl StoredOutcome {
    /// Outcome computed on this side from the attempt and the quiz key.
    pub fn computed(attempt: &Attempt, quiz: &Quiz) -> Self {
        let given: Vec<_> = quiz
            .questions
            .iter()
            .map(|q| attempt.answers.get(&q.id).copied())
            .collect();
        Self {
            score: attempt.score,
            correct_count: scoring::count_matches(&given, &quiz.correct_answers()),
            total: quiz.questions.len(),
            passed: attempt.passed,
        }
    }
}

/// Best-effort result handed back to the quiz flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistOutcome {
    pub score: u8,
    pub correct_count: usize,
    pub total: usize,
    pub passed: bool,
    pub source: OutcomeSource,
    pub warning: Option<String>,
}

impl PersistOutcome {
    fn from_stored(stored: StoredOutcome, source: OutcomeSource, warning: Option<String>) -> Self {
        Self {
            score: stored.score,
            correct_count: stored.correct_count,
            total: stored.total,
            passed: stored.passed,
            source,
            warning,
        }
    }

    pub fn not_stored(score: u8, total: usize, warning: String) -> Self {
        Self {
            score,
            correct_count: 0,
            total,
            passed: scoring::passed(score),
            source: OutcomeSource::NotStored,
            warning: Some(warning),
        }
    }
}

/// A place attempts can be written to.
///
/// Held as `Arc<dyn AttemptStore>` so the fallback policy (and tests) can swap backends.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn persist(&self, attempt: &Attempt, quiz: &Quiz) -> Result<StoredOutcome, PersistError>;
}

/// Backend first, local store second. The local store also keeps a copy of every
/// attempt the backend accepts, since it is the only attempt history there is.
pub struct FallbackPersister {
    primary: Arc<dyn AttemptStore>,
    fallback: Arc<dyn AttemptStore>,
}

impl FallbackPersister {
    pub fn new(primary: Arc<dyn AttemptStore>, fallback: Arc<dyn AttemptStore>) -> Self {
        Self { primary, fallback }
    }

    pub async fn persist(&self, attempt: &Attempt, quiz: &Quiz) -> PersistOutcome {
        let primary_error = match self.primary.persist(attempt, quiz).await {
            Ok(stored) => {
                info!(
                    "Attempt {} persisted via {} (score {})",
                    attempt.id,
                    self.primary.name(),
                    stored.score
                );
                let warning = self.record_history(attempt, quiz, &stored).await;
                return PersistOutcome::from_stored(stored, OutcomeSource::Backend, warning);
            }
            Err(e) => e,
        };

        warn!(
            "Persisting attempt {} via {} failed, falling back to {}: {primary_error}",
            attempt.id,
            self.primary.name(),
            self.fallback.name()
        );

        match self.fallback.persist(attempt, quiz).await {
            Ok(stored) => PersistOutcome::from_stored(
                stored,
                OutcomeSource::Local,
                Some(STORED_LOCALLY_WARNING.to_string()),
            ),
            Err(fallback_error) => {
                warn!("Fallback store {} also failed: {fallback_error}", self.fallback.name());
                PersistOutcome::from_stored(
                    StoredOutcome::computed(attempt, quiz),
                    OutcomeSource::NotStored,
                    Some(format!(
                        "Result could not be saved ({primary_error}; {fallback_error})."
                    )),
                )
            }
        }
    }

    /// The history copy of a backend-accepted attempt carries the backend's verdict.
    async fn record_history(
        &self,
        attempt: &Attempt,
        quiz: &Quiz,
        stored: &StoredOutcome,
    ) -> Option<String> {
        let mut recorded = attempt.clone();
        recorded.score = stored.score;
        recorded.passed = stored.passed;
        match self.fallback.persist(&recorded, quiz).await {
            Ok(_) => None,
            Err(e) => {
                warn!(
                    "Attempt {} saved, but {} could not record it: {e}",
                    attempt.id,
                    self.fallback.name()
                );
                Some(HISTORY_NOT_UPDATED_WARNING.to_string())
            }
        }
    }
}
