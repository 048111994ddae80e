use async_trait::async_trait;
use tracing::{info, warn};

use crate::models::{Attempt, EntityId, Quiz};
use crate::persistence::{AttemptStore, PersistError, StoredOutcome};
use crate::store::{results_key, LocalStore, StoreError};

/// Per-user attempt history in the local store, under `testResults_<user_id>`.
#[derive(Debug, Clone)]
pub struct LocalAttemptStore {
    store: LocalStore,
}

impl LocalAttemptStore {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// A user's attempts, oldest first. An unreadable history is treated as empty
    /// so one corrupt file never blocks the dashboard.
    pub async fn history(&self, user_id: &EntityId) -> Result<Vec<Attempt>, StoreError> {
        match self.store.get::<Vec<Attempt>>(&results_key(user_id)).await {
            Ok(history) => Ok(history.unwrap_or_default()),
            Err(e @ StoreError::Corrupt { .. }) => {
                warn!("Ignoring unreadable attempt history: {e}");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl AttemptStore for LocalAttemptStore {
    fn name(&self) -> &'static str {
        "local store"
    }

    async fn persist(&self, attempt: &Attempt, quiz: &Quiz) -> Result<StoredOutcome, PersistError> {
        let mut history = self.history(&attempt.user_id).await?;
        history.push(attempt.clone());
        self.store
            .set(&results_key(&attempt.user_id), &history)
            .await?;
        info!(
            "Attempt {} stored locally ({} attempts for user {})",
            attempt.id,
            history.len(),
            attempt.user_id
        );
        Ok(StoredOutcome::computed(attempt, quiz))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_attempt, sample_quiz};

    #[tokio::test]
    async fn test_attempts_append_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalAttemptStore::new(LocalStore::open(dir.path()).await.unwrap());
        let quiz = sample_quiz(2, 10);

        let first = sample_attempt(&quiz, &[Some(0), Some(1)]);
        let second = sample_attempt(&quiz, &[Some(0), None]);
        local.persist(&first, &quiz).await.unwrap();
        let stored = local.persist(&second, &quiz).await.unwrap();
        assert_eq!(stored.score, 50);
        assert_eq!(stored.correct_count, 1);

        let history = local.history(&first.user_id).await.unwrap();
        assert_eq!(history, vec![first, second]);
        assert!(local.history(&EntityId::from(999)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_record_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        let local = LocalAttemptStore::new(store.clone());
        let quiz = sample_quiz(1, 10);
        let attempt = sample_attempt(&quiz, &[Some(0)]);
        local.persist(&attempt, &quiz).await.unwrap();

        let raw: serde_json::Value = store
            .get(&results_key(&attempt.user_id))
            .await
            .unwrap()
            .unwrap();
        let record = &raw[0];
        for field in ["id", "quizId", "score", "answers", "timeSpent", "completedAt", "passed"] {
            assert!(record.get(field).is_some(), "missing {field}");
        }
        assert_eq!(record["answers"]["1"], serde_json::json!(0));
    }

    #[tokio::test]
    async fn test_corrupt_history_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalAttemptStore::new(LocalStore::open(dir.path()).await.unwrap());
        std::fs::write(dir.path().join("testResults_7.json"), b"[{").unwrap();
        assert!(local.history(&EntityId::from(7)).await.unwrap().is_empty());
    }
}
