use thiserror::Error;

use crate::api_client::ApiError;
use crate::store::StoreError;

/// Application-level error type.
///
/// Every flow returns `Result<T, AppError>`; the front end turns an error into a
/// message with [`AppError::user_message`] instead of aborting.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend unreachable, timed out, or answered with a server error.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Backend answered, but not with the shape we expect.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Local storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Connectivity and malformed responses are both recovered by falling back to local data.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Connectivity(_) | AppError::MalformedResponse(_)
        )
    }

    /// Message shown to the user. Internal details are logged, not displayed.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Connectivity(msg) => {
                tracing::warn!("Connectivity error: {msg}");
                "Could not reach the server. Please check your connection and try again."
                    .to_string()
            }
            AppError::MalformedResponse(msg) => {
                tracing::warn!("Malformed response: {msg}");
                "The server sent an unexpected response. Please try again later.".to_string()
            }
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Unauthenticated => {
                "You are not signed in. Run `readiness login` first.".to_string()
            }
            AppError::Storage(e) => {
                tracing::error!("Local storage error: {e}");
                "Local data could not be read or written.".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Api { status: 404, message } => AppError::NotFound(message),
            ApiError::Api {
                status: 400 | 401 | 409 | 422,
                message,
            } => AppError::Validation(message),
            ApiError::Parse(e) => AppError::MalformedResponse(e.to_string()),
            ApiError::Unexpected(msg) => AppError::MalformedResponse(msg),
            other => AppError::Connectivity(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_status_classification() {
        let not_found: AppError = ApiError::Api {
            status: 404,
            message: "Quiz not found".into(),
        }
        .into();
        assert!(matches!(not_found, AppError::NotFound(ref m) if m == "Quiz not found"));

        let bad_login: AppError = ApiError::Api {
            status: 401,
            message: "Invalid email or password".into(),
        }
        .into();
        assert_eq!(bad_login.user_message(), "Invalid email or password");

        let server: AppError = ApiError::Api {
            status: 503,
            message: "down".into(),
        }
        .into();
        assert!(server.is_recoverable());
    }

    #[test]
    fn test_malformed_counts_as_recoverable() {
        let err: AppError = ApiError::Unexpected("missing attempt_id".into()).into();
        assert!(matches!(err, AppError::MalformedResponse(_)));
        assert!(err.is_recoverable());
        assert!(!AppError::Validation("x".into()).is_recoverable());
    }
}
