//! ModerationState - per-user strike bookkeeping over a shared pattern set.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::foundation::{Timestamp, UserId};

use super::patterns::BannedPatternSet;
use super::strikes::{ModerationPolicy, ModerationVerdict, StrikeState};

/// Decides, per message attempt, whether a user's message goes out.
///
/// Strike states are created lazily on a user's first check and live for
/// the process lifetime. Moderation is advisory: with no patterns loaded
/// every message is allowed.
pub struct ModerationState {
    patterns: Arc<BannedPatternSet>,
    policy: ModerationPolicy,
    strikes: Mutex<HashMap<UserId, StrikeState>>,
}

impl ModerationState {
    pub fn new(patterns: Arc<BannedPatternSet>, policy: ModerationPolicy) -> Self {
        Self {
            patterns,
            policy,
            strikes: Mutex::new(HashMap::new()),
        }
    }

    /// Evaluates one message attempt by `user_id` at `now`.
    ///
    /// The strike map lock is never held across an await point.
    pub fn check(&self, user_id: &UserId, content: &str, now: Timestamp) -> ModerationVerdict {
        let mut strikes = self.strikes.lock().unwrap_or_else(PoisonError::into_inner);
        let state = strikes
            .entry(user_id.clone())
            .or_insert_with(|| StrikeState::new(user_id.clone()));

        let verdict = state.evaluate(now, &self.policy, || match self.patterns.find_match(content) {
            Some(pattern) => {
                tracing::debug!(user_id = %user_id, pattern = %pattern, "Banned pattern matched");
                true
            }
            None => false,
        });

        match verdict {
            ModerationVerdict::Warning { strike_count, .. } => {
                tracing::info!(user_id = %user_id, strike_count, "Moderation strike recorded");
            }
            ModerationVerdict::Blocked { muted_until } => {
                tracing::debug!(user_id = %user_id, muted_until = %muted_until.to_rfc3339(), "Message blocked");
            }
            _ => {}
        }

        verdict
    }

    /// Current strike state for a user, if one has been created.
    pub fn strike_state(&self, user_id: &UserId) -> Option<StrikeState> {
        self.strikes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
    }

    pub fn patterns(&self) -> &Arc<BannedPatternSet> {
        &self.patterns
    }

    pub fn policy(&self) -> &ModerationPolicy {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn t(secs: u64) -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000 + secs)
    }

    fn moderation(patterns: &[&str]) -> ModerationState {
        ModerationState::new(
            Arc::new(BannedPatternSet::with_patterns(patterns.iter().copied())),
            ModerationPolicy::default(),
        )
    }

    #[test]
    fn strike_state_is_created_lazily() {
        let m = moderation(&["spam"]);
        assert!(m.strike_state(&user("alice")).is_none());

        m.check(&user("alice"), "hello", t(0));
        let state = m.strike_state(&user("alice")).unwrap();
        assert_eq!(state.strike_count(), 0);
    }

    #[test]
    fn three_matches_then_muted_then_released() {
        let m = moderation(&["spam"]);
        let alice = user("alice");

        assert_eq!(
            m.check(&alice, "this is spam", t(0)),
            ModerationVerdict::Warning {
                strike_count: 1,
                strikes_remaining: 2
            }
        );
        assert_eq!(
            m.check(&alice, "this is spam", t(1)),
            ModerationVerdict::Warning {
                strike_count: 2,
                strikes_remaining: 1
            }
        );
        let muted_until = t(2).plus_secs(600);
        assert_eq!(
            m.check(&alice, "this is spam", t(2)),
            ModerationVerdict::Blocked { muted_until }
        );
        assert_eq!(
            m.check(&alice, "spam", t(3)),
            ModerationVerdict::Blocked { muted_until }
        );
        assert_eq!(
            m.check(&alice, "hello again", t(603)),
            ModerationVerdict::Allowed
        );
    }

    #[test]
    fn clean_message_while_muted_is_still_blocked() {
        let m = ModerationState::new(
            Arc::new(BannedPatternSet::with_patterns(["spam"])),
            ModerationPolicy {
                strike_limit: 1,
                ..Default::default()
            },
        );
        let bob = user("bob");
        m.check(&bob, "spam", t(0));

        assert!(m.check(&bob, "perfectly fine", t(10)).is_blocked());
    }

    #[test]
    fn oversized_mute_duration_does_not_panic() {
        let m = ModerationState::new(
            Arc::new(BannedPatternSet::with_patterns(["spam"])),
            ModerationPolicy {
                strike_limit: 1,
                mute_duration: std::time::Duration::from_secs(10_000_000_000_000),
            },
        );
        let carol = user("carol");

        assert!(m.check(&carol, "spam", t(0)).is_blocked());
        assert!(m.check(&carol, "hello", t(1)).is_blocked());
    }

    #[test]
    fn strikes_are_tracked_per_user() {
        let m = moderation(&["spam"]);
        m.check(&user("alice"), "spam", t(0));
        m.check(&user("alice"), "spam", t(1));

        let verdict = m.check(&user("bob"), "spam", t(2));
        assert_eq!(
            verdict,
            ModerationVerdict::Warning {
                strike_count: 1,
                strikes_remaining: 2
            }
        );
    }

    #[test]
    fn empty_pattern_set_fails_open() {
        let m = moderation(&["spam"]);
        m.patterns().replace_all(Vec::<String>::new());

        for i in 0..5 {
            assert!(m.check(&user("alice"), "spam", t(i)).is_allowed());
        }
    }

    #[test]
    fn reload_takes_effect_on_next_check() {
        let m = moderation(&[]);
        assert!(m.check(&user("alice"), "eggs", t(0)).is_allowed());

        m.patterns().replace_all(["eggs"]);
        assert!(!m.check(&user("alice"), "eggs", t(1)).is_allowed());
    }
}
