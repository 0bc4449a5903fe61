//! Per-user strike counting and temporary mutes.
//!
//! ```text
//!            match (strikes + 1 < limit)
//!          ┌──────────────┐
//!          ▼              │
//!   CLEAN(strikes) ───────┘
//!          │ match (strikes + 1 == limit)
//!          ▼
//!   MUTED(until) ── until <= now ──▶ CLEAN(0)   (evaluated lazily)
//! ```

use std::time::Duration;

use serde::Serialize;

use crate::domain::foundation::{Timestamp, UserId};

/// Tunables for the strike/mute state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModerationPolicy {
    /// Matching messages needed to trigger a mute.
    pub strike_limit: u32,
    /// How long a mute lasts.
    pub mute_duration: Duration,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            strike_limit: 3,
            mute_duration: Duration::from_secs(600),
        }
    }
}

/// Outcome of one message attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ModerationVerdict {
    /// No banned content; deliver normally.
    Allowed,
    /// Banned content short of a mute.
    Warning {
        strike_count: u32,
        strikes_remaining: u32,
    },
    /// Sender is muted; the message is dropped.
    Blocked { muted_until: Timestamp },
}

impl ModerationVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ModerationVerdict::Allowed)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, ModerationVerdict::Blocked { .. })
    }
}

/// Strike counter and mute expiry for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrikeState {
    user_id: UserId,
    strike_count: u32,
    muted_until: Option<Timestamp>,
}

impl StrikeState {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            strike_count: 0,
            muted_until: None,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn strike_count(&self) -> u32 {
        self.strike_count
    }

    /// Raw mute expiry. A value in the past means "not muted".
    pub fn muted_until(&self) -> Option<Timestamp> {
        self.muted_until
    }

    /// True while a mute is in force at `now`.
    pub fn is_muted_at(&self, now: Timestamp) -> bool {
        matches!(self.muted_until, Some(until) if until.is_after(&now))
    }

    /// Applies one message attempt.
    ///
    /// `contains_banned` is only invoked when the user is not muted, so a
    /// muted user's content is never scanned.
    pub fn evaluate(
        &mut self,
        now: Timestamp,
        policy: &ModerationPolicy,
        contains_banned: impl FnOnce() -> bool,
    ) -> ModerationVerdict {
        if let Some(until) = self.muted_until {
            if until.is_after(&now) {
                return ModerationVerdict::Blocked { muted_until: until };
            }
            // Expired mute: back to a clean slate for this attempt.
            self.muted_until = None;
            self.strike_count = 0;
        }

        if !contains_banned() {
            return ModerationVerdict::Allowed;
        }

        self.strike_count += 1;
        if self.strike_count >= policy.strike_limit.max(1) {
            let until = now.plus(policy.mute_duration);
            self.strike_count = 0;
            self.muted_until = Some(until);
            return ModerationVerdict::Blocked { muted_until: until };
        }

        ModerationVerdict::Warning {
            strike_count: self.strike_count,
            strikes_remaining: policy.strike_limit - self.strike_count,
        }
    }
}
