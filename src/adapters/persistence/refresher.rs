//! ModerationListRefresher - periodically pulls moderation lists.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 60s | Time between reloads |
//!
//! The first reload happens immediately when [`ModerationListRefresher::run`]
//! starts. Each list is swapped in whole or not at all: a failed fetch keeps
//! the previous list active.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::domain::moderation::{BannedPatternSet, HighlightedUsers};
use crate::ports::ModerationListSource;

/// What a single reload changed. `None` means that list's fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub patterns: Option<usize>,
    pub highlights: Option<usize>,
}

/// Background task keeping the hub's moderation lists current.
pub struct ModerationListRefresher {
    source: Arc<dyn ModerationListSource>,
    patterns: Arc<BannedPatternSet>,
    highlights: Arc<HighlightedUsers>,
    interval: Duration,
}

impl ModerationListRefresher {
    pub fn new(
        source: Arc<dyn ModerationListSource>,
        patterns: Arc<BannedPatternSet>,
        highlights: Arc<HighlightedUsers>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            patterns,
            highlights,
            interval,
        }
    }

    /// Reload until the shutdown signal flips to `true`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("Moderation list refresher stopping");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.refresh_once().await;
                }
            }
        }
    }

    /// Runs one reload of both lists.
    pub async fn refresh_once(&self) -> RefreshOutcome {
        let patterns = match self.source.banned_patterns().await {
            Ok(words) => Some(self.patterns.replace_all(words)),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to reload banned words, keeping previous list");
                None
            }
        };

        let highlights = match self.source.highlighted_users().await {
            Ok(colors) => Some(self.highlights.replace_all(colors)),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to reload highlighted users, keeping previous list");
                None
            }
        };

        tracing::debug!(?patterns, ?highlights, "Moderation lists reloaded");
        RefreshOutcome {
            patterns,
            highlights,
        }
    }
}
