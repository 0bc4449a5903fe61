//! Persistence collaborator configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// Where accepted messages and moderation lists live.
///
/// Without a `base_url` the relay runs with in-memory storage and the
/// banned words from `moderation.banned_words`.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// REST backend base URL
    pub base_url: Option<String>,

    /// Bearer token for the backend
    pub api_token: Option<Secret<String>>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl PersistenceConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured, non-empty base URL
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    /// Configured, non-empty API token
    pub fn api_token(&self) -> Option<&str> {
        self.api_token
            .as_ref()
            .map(|t| t.expose_secret().as_str())
            .filter(|t| !t.is_empty())
    }

    /// Validate persistence configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }

        if let Some(url) = self.base_url() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidPersistenceUrl);
            }
            if *environment == Environment::Production && !url.starts_with("https://") {
                return Err(ValidationError::PersistenceUrlMustBeHttps);
            }
        }
        Ok(())
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_token: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}
