//! Content moderation: banned-word strikes leading to temporary mutes.
//!
//! - [`BannedPatternSet`] - refreshable banned substring list
//! - [`StrikeState`] - per-user strike/mute state machine
//! - [`ModerationState`] - owns every user's strike state
//! - [`HighlightedUsers`] - admin-assigned username colours

mod highlights;
mod patterns;
mod state;
mod strikes;

pub use highlights::HighlightedUsers;
pub use patterns::BannedPatternSet;
pub use state::ModerationState;
pub use strikes::{ModerationPolicy, ModerationVerdict, StrikeState};
