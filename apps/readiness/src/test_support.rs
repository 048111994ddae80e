//! Shared fixtures for unit tests: sample quizzes, fake stores and an in-process backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api_client::ApiError;
use crate::models::{Answer, AnswerKind, Attempt, EntityId, Question, Quiz};
use crate::persistence::{AttemptStore, PersistError, StoredOutcome};
use crate::quiz::scoring;

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

/// Quiz with `questions` four-option questions; question `i` has id `i + 1`,
/// options "Option 1".."Option 4", and correct answer index `i % 4`.
pub(crate) fn sample_quiz(questions: usize, minutes: u32) -> Quiz {
    Quiz {
        id: EntityId::from(1),
        title: "Workplace Communication".to_string(),
        description: Some("Sample quiz".to_string()),
        duration_minutes: minutes,
        category: Some("Communication".to_string()),
        difficulty: None,
        tags: vec!["communication".to_string()],
        questions: (0..questions)
            .map(|i| Question {
                id: EntityId::from(i as i64 + 1),
                prompt: format!("Question {}", i + 1),
                scenario: None,
                kind: AnswerKind::MultipleChoice,
                options: (1..=4).map(|n| format!("Option {n}")).collect(),
                correct: Some(Answer::Choice(i % 4)),
                explanation: None,
            })
            .collect(),
    }
}

/// Attempt by user 7 picking option `picks[i]` for question `i` (`None` = skipped).
pub(crate) fn sample_attempt(quiz: &Quiz, picks: &[Option<usize>]) -> Attempt {
    let answers: BTreeMap<EntityId, Answer> = quiz
        .questions
        .iter()
        .zip(picks)
        .filter_map(|(q, pick)| pick.map(|p| (q.id.clone(), Answer::Choice(p))))
        .collect();
    let given: Vec<Option<Answer>> = picks.iter().map(|p| p.map(Answer::Choice)).collect();
    let score = scoring::score(&given, &quiz.correct_answers()).unwrap_or(0);
    Attempt {
        id: Uuid::new_v4(),
        user_id: EntityId::from(7),
        quiz_id: quiz.id.clone(),
        answers,
        time_spent: 120,
        score,
        passed: scoring::passed(score),
        completed_at: t0(),
        auto_submit: false,
        category: quiz.category.clone(),
    }
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub(crate) async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// URL of a local port nothing listens on.
pub(crate) async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

#[derive(Default)]
pub(crate) struct RecordingStore {
    attempts: Mutex<Vec<Attempt>>,
}

impl RecordingStore {
    pub(crate) async fn count(&self) -> usize {
        self.attempts.lock().await.len()
    }
}

#[async_trait]
impl AttemptStore for RecordingStore {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn persist(&self, attempt: &Attempt, quiz: &Quiz) -> Result<StoredOutcome, PersistError> {
        self.attempts.lock().await.push(attempt.clone());
        Ok(StoredOutcome::computed(attempt, quiz))
    }
}

pub(crate) struct FailingStore;

#[async_trait]
impl AttemptStore for FailingStore {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn persist(&self, _: &Attempt, _: &Quiz) -> Result<StoredOutcome, PersistError> {
        Err(PersistError::Api(ApiError::Unavailable { retries: 0 }))
    }
}
