//! Choosing a specialization: the dependent selection cascade and saving its result.

use tracing::{info, warn};

use crate::account;
use crate::api_client::ApiClient;
use crate::errors::AppError;
use crate::models::User;
use crate::store::LocalStore;

pub mod cascade;

pub use cascade::{Cascade, OnboardingChoice};

pub const SAVED_LOCALLY_WARNING: &str =
    "Saved on this device only. The server could not be reached.";

/// Result of saving a specialization choice.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedChoice {
    pub user: User,
    pub warning: Option<String>,
}

/// Sends the choice to the backend and updates the remembered user.
///
/// An unreachable backend still updates the local record and returns a warning;
/// a rejection (e.g. unknown user) is returned as an error and nothing changes.
pub async fn save_choice(
    api: &ApiClient,
    store: &LocalStore,
    mut user: User,
    choice: &OnboardingChoice,
) -> Result<SavedChoice, AppError> {
    let warning = match api
        .update_specialization(&user.id, &choice.specialization_id)
        .await
        .map_err(AppError::from)
    {
        Ok(()) => None,
        Err(e) if e.is_recoverable() => {
            warn!("Saving specialization for user {} failed: {e}", user.id);
            Some(SAVED_LOCALLY_WARNING.to_string())
        }
        Err(e) => return Err(e),
    };

    user.specialization_id = Some(choice.specialization_id.clone());
    account::set_current_user(store, &user).await?;
    info!(
        "User {} chose specialization {} (branch {}, sector {})",
        user.id, choice.specialization_id, choice.branch_id, choice.sector_id
    );
    Ok(SavedChoice { user, warning })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{extract::Path, http::StatusCode, routing::patch, Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::models::EntityId;
    use crate::test_support::{closed_port_url, spawn_backend};

    fn user() -> User {
        User {
            id: EntityId::from(5),
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            specialization_id: None,
            readiness_score: None,
            technical_score: None,
            soft_skills_score: None,
            created_at: None,
        }
    }

    fn choice() -> OnboardingChoice {
        OnboardingChoice {
            sector_id: EntityId::from(1),
            branch_id: EntityId::from(10),
            specialization_id: EntityId::from(101),
        }
    }

    fn client_for(server: &str) -> ApiClient {
        ApiClient::new(format!("{server}/api"), server, Duration::from_secs(5), 0).unwrap()
    }

    #[tokio::test]
    async fn test_choice_is_sent_and_remembered() {
        let router = Router::new().route(
            "/api/users/:id/specialization",
            patch(|Path(id): Path<i64>, Json(body): Json<Value>| async move {
                assert_eq!(id, 5);
                assert_eq!(body["specialization_id"], json!(101));
                Json(json!({"success": true}))
            }),
        );
        let server = spawn_backend(router).await;
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        let saved = save_choice(&client_for(&server), &store, user(), &choice())
            .await
            .unwrap();
        assert_eq!(saved.warning, None);
        assert_eq!(saved.user.specialization_id, Some(EntityId::from(101)));
        assert_eq!(account::current_user(&store).await.unwrap(), saved.user);
    }

    #[tokio::test]
    async fn test_unreachable_backend_saves_locally_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        let api = client_for(&closed_port_url().await);

        let saved = save_choice(&api, &store, user(), &choice()).await.unwrap();
        assert_eq!(saved.warning.as_deref(), Some(SAVED_LOCALLY_WARNING));
        let remembered = account::current_user(&store).await.unwrap();
        assert_eq!(remembered.specialization_id, Some(EntityId::from(101)));
    }

    #[tokio::test]
    async fn test_rejection_changes_nothing() {
        let router = Router::new().route(
            "/api/users/:id/specialization",
            patch(|| async { (StatusCode::NOT_FOUND, Json(json!({"detail": "User not found"}))) }),
        );
        let server = spawn_backend(router).await;
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        let err = save_choice(&client_for(&server), &store, user(), &choice())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(account::current_user(&store).await.is_err());
    }
}
