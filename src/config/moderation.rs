//! Moderation configuration

use serde::Deserialize;
use std::time::Duration;

use crate::domain::moderation::ModerationPolicy;

use super::error::ValidationError;

/// Longest configurable mute: one year.
pub const MAX_MUTE_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Strike policy, list reload cadence and message limits
#[derive(Debug, Clone, Deserialize)]
pub struct ModerationConfig {
    /// Banned-word matches before a mute
    #[serde(default = "default_strike_limit")]
    pub strike_limit: u32,

    /// Mute length in seconds
    #[serde(default = "default_mute_duration")]
    pub mute_duration_secs: u64,

    /// Seconds between moderation list reloads
    #[serde(default = "default_reload_interval")]
    pub reload_interval_secs: u64,

    /// Longest accepted message, in characters
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    /// Banned words (comma-separated), used when no persistence URL is set
    pub banned_words: Option<String>,
}

impl ModerationConfig {
    pub fn policy(&self) -> ModerationPolicy {
        ModerationPolicy {
            strike_limit: self.strike_limit,
            mute_duration: Duration::from_secs(self.mute_duration_secs),
        }
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval_secs)
    }

    /// Validate moderation configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.strike_limit == 0 {
            return Err(ValidationError::InvalidStrikeLimit);
        }
        if self.mute_duration_secs == 0 {
            return Err(ValidationError::InvalidMuteDuration);
        }
        if self.mute_duration_secs > MAX_MUTE_DURATION_SECS {
            return Err(ValidationError::MuteDurationTooLong {
                max_secs: MAX_MUTE_DURATION_SECS,
            });
        }
        if self.reload_interval_secs == 0 {
            return Err(ValidationError::InvalidReloadInterval);
        }
        if self.max_message_chars == 0 {
            return Err(ValidationError::InvalidMaxMessageChars);
        }
        Ok(())
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            strike_limit: default_strike_limit(),
            mute_duration_secs: default_mute_duration(),
            reload_interval_secs: default_reload_interval(),
            max_message_chars: default_max_message_chars(),
            banned_words: None,
        }
    }
}

fn default_strike_limit() -> u32 {
    3
}

fn default_mute_duration() -> u64 {
    600
}

fn default_reload_interval() -> u64 {
    60
}

fn default_max_message_chars() -> usize {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_policy_defaults() {
        let config = ModerationConfig::default();
        assert_eq!(config.policy(), ModerationPolicy::default());
        assert_eq!(config.reload_interval(), Duration::from_secs(60));
        assert_eq!(config.max_message_chars, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_strike_limit_rejected() {
        let config = ModerationConfig {
            strike_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidStrikeLimit));
    }

    #[test]
    fn test_zero_durations_rejected() {
        let config = ModerationConfig {
            mute_duration_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidMuteDuration));

        let config = ModerationConfig {
            reload_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidReloadInterval));
    }

    #[test]
    fn test_mute_duration_upper_bound() {
        let config = ModerationConfig {
            mute_duration_secs: 10_000_000_000_000,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MuteDurationTooLong {
                max_secs: MAX_MUTE_DURATION_SECS
            })
        );

        let config = ModerationConfig {
            mute_duration_secs: MAX_MUTE_DURATION_SECS,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_message_length_rejected() {
        let config = ModerationConfig {
            max_message_chars: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidMaxMessageChars));
    }
}
