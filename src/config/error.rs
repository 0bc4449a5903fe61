//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),

    #[error("Strike limit must be at least 1")]
    InvalidStrikeLimit,

    #[error("Mute duration must be greater than zero")]
    InvalidMuteDuration,

    #[error("Mute duration must not exceed {max_secs} seconds")]
    MuteDurationTooLong { max_secs: u64 },

    #[error("Reload interval must be greater than zero")]
    InvalidReloadInterval,

    #[error("Maximum message length must be greater than zero")]
    InvalidMaxMessageChars,

    #[error("Invalid persistence request timeout")]
    InvalidTimeout,

    #[error("Invalid persistence URL format")]
    InvalidPersistenceUrl,

    #[error("Persistence URL must use HTTPS in production")]
    PersistenceUrlMustBeHttps,

    #[error("Outbound buffer must be greater than zero")]
    InvalidOutboundBuffer,
}
