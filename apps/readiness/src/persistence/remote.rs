use async_trait::async_trait;
use tracing::debug;

use crate::api_client::wire::{AnswerPayload, SubmitRequest};
use crate::api_client::ApiClient;
use crate::models::{Attempt, Quiz};
use crate::persistence::{AttemptStore, PersistError, StoredOutcome};

/// Two-step backend submission: open a server-side attempt, then submit answers to it.
pub struct RemoteAttemptStore {
    client: ApiClient,
}

impl RemoteAttemptStore {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AttemptStore for RemoteAttemptStore {
    fn name(&self) -> &'static str {
        "backend"
    }

    async fn persist(&self, attempt: &Attempt, quiz: &Quiz) -> Result<StoredOutcome, PersistError> {
        let attempt_id = self
            .client
            .start_attempt(&attempt.quiz_id, &attempt.user_id)
            .await?;
        debug!("Server attempt {attempt_id} opened for local attempt {}", attempt.id);

        let response = self
            .client
            .submit_attempt(&attempt_id, &build_submission(attempt, quiz))
            .await?;

        Ok(StoredOutcome {
            score: response.score.round().clamp(0.0, 100.0) as u8,
            correct_count: response.correct,
            total: response.total,
            passed: response.passed,
        })
    }
}

/// Every question is sent so the server counts unanswered ones in its total;
/// an unanswered question carries an empty answer, which matches no option.
pub(crate) fn build_submission(attempt: &Attempt, quiz: &Quiz) -> SubmitRequest {
    SubmitRequest {
        answers: quiz
            .questions
            .iter()
            .map(|q| AnswerPayload {
                question_id: q.id.clone(),
                selected_answer: attempt
                    .answers
                    .get(&q.id)
                    .and_then(|a| q.answer_text(a))
                    .unwrap_or_default(),
            })
            .collect(),
    }
}
