//! REST client. Every backend call in the crate goes through here.
//!
//! No other module builds HTTP requests. Idempotent reads are retried on 5xx/429 and
//! transport errors with exponential backoff; writes are sent once so a retry never
//! creates a second server-side attempt.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{Branch, EntityId, Quiz, QuizSummary, Sector, Specialization, User};

pub mod wire;

use wire::{
    AuthResponse, ErrorBody, LoginRequest, QuizListResponse, RegisterRequest, StartResponse,
    SubmitRequest, SubmitResponse, UpdateSpecializationRequest, WireQuiz,
};

const RETRY_BASE_DELAY_MS: u64 = 250;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unexpected response: {0}")]
    Unexpected(String),

    #[error("Backend unavailable after {retries} retries")]
    Unavailable { retries: u32 },
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    root_url: String,
    max_retries: u32,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        root_url: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into(),
            root_url: root_url.into(),
            max_retries,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(
            config.api_base_url.clone(),
            config.api_root_url.clone(),
            config.http_timeout,
            config.http_max_retries,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Probes the server root. Used before trying backend data at all.
    pub async fn health(&self) -> Result<serde_json::Value, ApiError> {
        let url = format!("{}/", self.root_url);
        self.execute("GET /", false, || self.client.get(&url)).await
    }

    pub async fn is_available(&self) -> bool {
        match self.health().await {
            Ok(_) => true,
            Err(e) => {
                debug!("Backend health probe failed: {e}");
                false
            }
        }
    }

    pub async fn sectors(&self) -> Result<Vec<Sector>, ApiError> {
        let url = self.url("/sectors");
        self.execute("GET /sectors", true, || self.client.get(&url))
            .await
    }

    pub async fn branches(&self, sector_id: &EntityId) -> Result<Vec<Branch>, ApiError> {
        let url = self.url(&format!("/sectors/{sector_id}/branches"));
        self.execute("GET /sectors/{id}/branches", true, || self.client.get(&url))
            .await
    }

    pub async fn specializations(
        &self,
        branch_id: &EntityId,
    ) -> Result<Vec<Specialization>, ApiError> {
        let url = self.url(&format!("/branches/{branch_id}/specializations"));
        self.execute("GET /branches/{id}/specializations", true, || {
            self.client.get(&url)
        })
        .await
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<User, ApiError> {
        let url = self.url("/users/register");
        let body = RegisterRequest {
            email,
            password,
            name,
        };
        let response: AuthResponse = self
            .execute("POST /users/register", false, || {
                self.client.post(&url).json(&body)
            })
            .await?;
        unwrap_user(response)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let url = self.url("/users/login");
        let body = LoginRequest { email, password };
        let response: AuthResponse = self
            .execute("POST /users/login", false, || {
                self.client.post(&url).json(&body)
            })
            .await?;
        unwrap_user(response)
    }

    pub async fn update_specialization(
        &self,
        user_id: &EntityId,
        specialization_id: &EntityId,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!("/users/{user_id}/specialization"));
        let body = UpdateSpecializationRequest { specialization_id };
        let _: serde_json::Value = self
            .execute("PATCH /users/{id}/specialization", false, || {
                self.client.patch(&url).json(&body)
            })
            .await?;
        Ok(())
    }

    pub async fn quizzes(&self) -> Result<Vec<QuizSummary>, ApiError> {
        let url = self.url("/quizzes");
        let response: QuizListResponse = self
            .execute("GET /quizzes", true, || self.client.get(&url))
            .await?;
        Ok(response
            .into_inner()
            .into_iter()
            .map(WireQuiz::into_summary)
            .collect())
    }

    pub async fn quiz(&self, quiz_id: &EntityId) -> Result<Quiz, ApiError> {
        let url = self.url(&format!("/quizzes/{quiz_id}"));
        let quiz: WireQuiz = self
            .execute("GET /quizzes/{id}", true, || self.client.get(&url))
            .await?;
        Ok(quiz.into_quiz())
    }

    /// Opens a server-side attempt and returns its id.
    pub async fn start_attempt(
        &self,
        quiz_id: &EntityId,
        user_id: &EntityId,
    ) -> Result<EntityId, ApiError> {
        let url = self.url(&format!("/quizzes/{quiz_id}/start"));
        let response: StartResponse = self
            .execute("POST /quizzes/{id}/start", false, || {
                self.client
                    .post(&url)
                    .query(&[("user_id", user_id.as_str())])
            })
            .await?;
        Ok(response.attempt_id)
    }

    pub async fn submit_attempt(
        &self,
        attempt_id: &EntityId,
        submission: &SubmitRequest,
    ) -> Result<SubmitResponse, ApiError> {
        let url = self.url(&format!("/attempts/{attempt_id}/submit"));
        self.execute("POST /attempts/{id}/submit", false, || {
            self.client.post(&url).json(submission)
        })
        .await
    }

    /// Sends the request built by `build`, retrying when `retryable` is set.
    async fn execute<T, F>(&self, endpoint: &str, retryable: bool, build: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let attempts = if retryable { self.max_retries + 1 } else { 1 };
        let mut last_error: Option<ApiError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                // Exponential backoff: 250ms, 500ms, 1s, ...
                let delay = Duration::from_millis(RETRY_BASE_DELAY_MS << (attempt - 1));
                warn!(
                    "{endpoint} attempt {attempt} failed, retrying after {}ms...",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match build().send().await {
                Ok(r) => r,
                Err(e) => {
                    debug!("{endpoint} transport error: {e}");
                    last_error = Some(ApiError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("{endpoint} returned {status}");
                last_error = Some(ApiError::Api {
                    status: status.as_u16(),
                    message: error_message(&body, status),
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ApiError::Api {
                    status: status.as_u16(),
                    message: error_message(&body, status),
                });
            }

            let body = response.text().await?;
            debug!("{endpoint} succeeded ({} bytes)", body.len());
            return serde_json::from_str(&body).map_err(ApiError::Parse);
        }

        Err(last_error.unwrap_or(ApiError::Unavailable {
            retries: self.max_retries,
        }))
    }
}

fn unwrap_user(response: AuthResponse) -> Result<User, ApiError> {
    match response {
        AuthResponse {
            success: true,
            user: Some(user),
        } => Ok(user),
        _ => Err(ApiError::Unexpected(
            "authentication response carried no user".to_string(),
        )),
    }
}

/// Pulls `detail` out of a FastAPI-style error body, falling back to the raw body.
fn error_message(body: &str, status: StatusCode) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => format!("HTTP error! status: {}", status.as_u16()),
        Err(_) => body.to_string(),
    }
}
