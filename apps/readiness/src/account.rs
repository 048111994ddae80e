//! Sign-up, sign-in and the locally remembered current user.

use tracing::{info, warn};

use crate::api_client::ApiClient;
use crate::errors::AppError;
use crate::models::User;
use crate::store::{LocalStore, StoreError, CURRENT_USER_KEY};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl Registration {
    /// Checks the form before anything is sent. The first problem found is reported.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Please enter your name".to_string()));
        }
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.password != self.confirm_password {
            return Err(AppError::Validation("Passwords do not match".to_string()));
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::Validation(
            "Please enter a valid email address".to_string(),
        )),
    }
}

pub async fn register(
    api: &ApiClient,
    store: &LocalStore,
    form: &Registration,
) -> Result<User, AppError> {
    form.validate()?;
    let user = api
        .register(form.email.trim(), &form.password, form.name.trim())
        .await?;
    set_current_user(store, &user).await?;
    info!("Registered user {}", user.id);
    Ok(user)
}

pub async fn login(
    api: &ApiClient,
    store: &LocalStore,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    validate_email(email)?;
    if password.is_empty() {
        return Err(AppError::Validation("Please enter your password".to_string()));
    }
    let user = api.login(email.trim(), password).await?;
    set_current_user(store, &user).await?;
    info!("User {} signed in", user.id);
    Ok(user)
}

pub async fn logout(store: &LocalStore) -> Result<(), AppError> {
    store.remove(CURRENT_USER_KEY).await?;
    info!("Signed out");
    Ok(())
}

/// The signed-in user. An unreadable record counts as signed out.
pub async fn current_user(store: &LocalStore) -> Result<User, AppError> {
    match store.get::<User>(CURRENT_USER_KEY).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(AppError::Unauthenticated),
        Err(e @ StoreError::Corrupt { .. }) => {
            warn!("Discarding unreadable current user: {e}");
            Err(AppError::Unauthenticated)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn set_current_user(store: &LocalStore, user: &User) -> Result<(), AppError> {
    store.set(CURRENT_USER_KEY, user).await?;
    Ok(())
}
