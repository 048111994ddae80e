use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_DATA_DIR: &str = ".readiness";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_HTTP_MAX_RETRIES: u32 = 2;

/// Client configuration loaded from environment variables (and `.env` when present).
/// Every value has a default so the client starts against a local backend out of the box.
#[derive(Debug, Clone)]
pub struct Config {
    /// Prefix for every REST call, e.g. `http://localhost:8000/api`.
    pub api_base_url: String,
    /// Server root used for the health probe.
    pub api_root_url: String,
    /// Directory holding the local fallback store.
    pub data_dir: PathBuf,
    pub http_timeout: Duration,
    pub http_max_retries: u32,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_base_url = lookup("API_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_root_url = lookup("API_ROOT_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| derive_root_url(&api_base_url));

        let http_timeout_secs = match lookup("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .context("HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };
        let http_max_retries = match lookup("HTTP_MAX_RETRIES") {
            Some(raw) => raw
                .parse::<u32>()
                .context("HTTP_MAX_RETRIES must be a non-negative integer")?,
            None => DEFAULT_HTTP_MAX_RETRIES,
        };

        Ok(Config {
            api_base_url,
            api_root_url,
            data_dir: lookup("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            http_timeout: Duration::from_secs(http_timeout_secs),
            http_max_retries,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Applies command-line overrides on top of the environment.
    pub fn with_overrides(mut self, api_base_url: Option<String>, data_dir: Option<PathBuf>) -> Self {
        if let Some(url) = api_base_url {
            self.api_base_url = url.trim_end_matches('/').to_string();
            self.api_root_url = derive_root_url(&self.api_base_url);
        }
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }
}

/// `http://host:8000/api` -> `http://host:8000`
fn derive_root_url(base: &str) -> String {
    base.strip_suffix("/api").unwrap_or(base).to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8000/api");
        assert_eq!(config.api_root_url, "http://localhost:8000");
        assert_eq!(config.data_dir, PathBuf::from(".readiness"));
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert_eq!(config.http_max_retries, 2);
        assert_eq!(config.rust_log, "info");
    }

    #[test]
    fn test_root_url_derived_from_base() {
        let config = config_from(&[("API_BASE_URL", "https://quiz.example.com/api/")]).unwrap();
        assert_eq!(config.api_base_url, "https://quiz.example.com/api");
        assert_eq!(config.api_root_url, "https://quiz.example.com");
    }

    #[test]
    fn test_explicit_root_url_wins() {
        let config = config_from(&[
            ("API_BASE_URL", "http://a/api"),
            ("API_ROOT_URL", "http://b"),
        ])
        .unwrap();
        assert_eq!(config.api_root_url, "http://b");
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let err = config_from(&[("HTTP_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("HTTP_TIMEOUT_SECS"));
    }

    #[test]
    fn test_cli_overrides_replace_env_values() {
        let config = config_from(&[])
            .unwrap()
            .with_overrides(Some("http://10.0.0.2:9000/api".into()), Some("/tmp/r".into()));
        assert_eq!(config.api_root_url, "http://10.0.0.2:9000");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/r"));
    }
}
