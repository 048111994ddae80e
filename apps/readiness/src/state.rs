use std::sync::Arc;

use crate::api_client::ApiClient;
use crate::config::Config;
use crate::errors::AppError;
use crate::persistence::{FallbackPersister, LocalAttemptStore, RemoteAttemptStore};
use crate::store::LocalStore;

/// Everything a command needs, built once in `main` and passed down.
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub api: ApiClient,
    pub store: LocalStore,
    /// Attempt history in the local store; also the fallback half of `persister`.
    pub history: LocalAttemptStore,
    /// Backend first, local store second.
    pub persister: Arc<FallbackPersister>,
}

impl AppContext {
    pub async fn new(config: Config) -> Result<Self, AppError> {
        let api = ApiClient::from_config(&config).map_err(AppError::from)?;
        let store = LocalStore::open(&config.data_dir).await?;
        let history = LocalAttemptStore::new(store.clone());
        let persister = Arc::new(FallbackPersister::new(
            Arc::new(RemoteAttemptStore::new(api.clone())),
            Arc::new(history.clone()),
        ));
        Ok(Self {
            config,
            api,
            store,
            history,
            persister,
        })
    }
}
