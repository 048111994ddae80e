use std::collections::BTreeMap;

use serde::Serialize;

use crate::errors::AppError;
use crate::models::{Attempt, EntityId};
use crate::persistence::LocalAttemptStore;

/// How many attempts the "recent activity" list shows.
pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub count: usize,
    pub average_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_attempts: usize,
    pub average_score: u8,
    pub best_score: u8,
    pub passed: usize,
    pub failed: usize,
    pub total_time_secs: u64,
    /// Newest first.
    pub recent: Vec<Attempt>,
    pub by_category: BTreeMap<String, CategoryStats>,
}

pub fn compute_stats(history: &[Attempt]) -> DashboardStats {
    let passed = history.iter().filter(|a| a.passed).count();

    let mut recent: Vec<Attempt> = history.to_vec();
    recent.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    recent.truncate(RECENT_LIMIT);

    let mut totals: BTreeMap<String, (usize, u64)> = BTreeMap::new();
    for attempt in history {
        if let Some(category) = &attempt.category {
            let entry = totals.entry(category.clone()).or_default();
            entry.0 += 1;
            entry.1 += u64::from(attempt.score);
        }
    }
    let by_category = totals
        .into_iter()
        .map(|(category, (count, sum))| {
            (
                category,
                CategoryStats {
                    count,
                    average_score: rounded_mean(sum, count),
                },
            )
        })
        .collect();

    DashboardStats {
        total_attempts: history.len(),
        average_score: rounded_mean(history.iter().map(|a| u64::from(a.score)).sum(), history.len()),
        best_score: history.iter().map(|a| a.score).max().unwrap_or(0),
        passed,
        failed: history.len() - passed,
        total_time_secs: history.iter().map(|a| a.time_spent).sum(),
        recent,
        by_category,
    }
}

/// Mean of scores rounded half up; 0 for no scores.
fn rounded_mean(sum: u64, count: usize) -> u8 {
    if count == 0 {
        return 0;
    }
    let count = count as u64;
    ((2 * sum + count) / (2 * count)).min(100) as u8
}

pub async fn load_stats(
    history: &LocalAttemptStore,
    user_id: &EntityId,
) -> Result<DashboardStats, AppError> {
    let attempts = history.history(user_id).await?;
    Ok(compute_stats(&attempts))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use std::sync::Arc;

    use super::*;
    use crate::persistence::{AttemptStore, FallbackPersister, OutcomeSource};
    use crate::store::LocalStore;
    use crate::test_support::{sample_attempt, sample_quiz, t0, RecordingStore};

    fn attempt(score: u8, minutes_after: i64, category: Option<&str>) -> Attempt {
        let quiz = sample_quiz(1, 10);
        let mut attempt = sample_attempt(&quiz, &[Some(0)]);
        attempt.score = score;
        attempt.passed = score >= 70;
        attempt.completed_at = t0() + Duration::minutes(minutes_after);
        attempt.category = category.map(str::to_string);
        attempt
    }

    #[test]
    fn test_empty_history() {
        let stats = compute_stats(&[]);
        assert_eq!(stats.total_attempts, 0);
        assert_eq!(stats.average_score, 0);
        assert_eq!(stats.best_score, 0);
        assert!(stats.recent.is_empty());
        assert!(stats.by_category.is_empty());
    }

    #[test]
    fn test_aggregates() {
        let history = vec![
            attempt(60, 0, Some("Business")),
            attempt(85, 1, Some("Business")),
            attempt(70, 2, Some("Technology")),
            attempt(40, 3, None),
        ];
        let stats = compute_stats(&history);
        assert_eq!(stats.total_attempts, 4);
        // 255 / 4 = 63.75
        assert_eq!(stats.average_score, 64);
        assert_eq!(stats.best_score, 85);
        assert_eq!(stats.passed, 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.total_time_secs, 4 * 120);

        let business = &stats.by_category["Business"];
        assert_eq!(business.count, 2);
        // 72.5 rounds up
        assert_eq!(business.average_score, 73);
        assert_eq!(stats.by_category.len(), 2);
    }

    #[test]
    fn test_recent_is_newest_first_and_capped() {
        let history: Vec<Attempt> = (0..7).map(|i| attempt(10 * i as u8, i, None)).collect();
        let stats = compute_stats(&history);
        let scores: Vec<u8> = stats.recent.iter().map(|a| a.score).collect();
        assert_eq!(scores, vec![60, 50, 40, 30, 20]);
    }

    #[tokio::test]
    async fn test_stats_read_local_history() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalAttemptStore::new(LocalStore::open(dir.path()).await.unwrap());
        let quiz = sample_quiz(2, 10);
        local
            .persist(&sample_attempt(&quiz, &[Some(0), Some(1)]), &quiz)
            .await
            .unwrap();

        let stats = load_stats(&local, &EntityId::from(7)).await.unwrap();
        assert_eq!(stats.total_attempts, 1);
        assert_eq!(stats.average_score, 100);
        assert_eq!(stats.by_category["Communication"].count, 1);
    }

    #[tokio::test]
    async fn test_backend_saved_attempts_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalAttemptStore::new(LocalStore::open(dir.path()).await.unwrap());
        let persister =
            FallbackPersister::new(Arc::new(RecordingStore::default()), Arc::new(local.clone()));

        let quiz = sample_quiz(4, 10);
        let attempt = sample_attempt(&quiz, &[Some(0), Some(1), Some(2), None]);
        let outcome = persister.persist(&attempt, &quiz).await;
        assert_eq!(outcome.source, OutcomeSource::Backend);

        let stats = load_stats(&local, &EntityId::from(7)).await.unwrap();
        assert_eq!(stats.total_attempts, 1);
        assert_eq!(stats.average_score, 75);
        assert_eq!(stats.best_score, 75);
        assert_eq!(stats.passed, 1);
        assert_eq!(stats.recent[0].id, attempt.id);
    }
}
