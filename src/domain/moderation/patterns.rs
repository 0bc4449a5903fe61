//! Banned substring list used by content moderation.
//!
//! The list is replaced wholesale whenever the admin list is reloaded.
//! A check clones the current `Arc` and scans it without holding the lock,
//! so a reload never interrupts a scan already in progress; the next check
//! sees the new list.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

/// Refreshable set of lowercase banned substrings.
#[derive(Debug, Default)]
pub struct BannedPatternSet {
    patterns: RwLock<Arc<Vec<String>>>,
}

impl BannedPatternSet {
    /// Creates an empty set. An empty set matches nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set pre-populated with patterns.
    pub fn with_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: RwLock::new(Arc::new(normalize(patterns))),
        }
    }

    /// Atomically swaps the active pattern list.
    ///
    /// Entries are trimmed and lowercased; blank entries and duplicates are
    /// discarded. Returns the number of active patterns.
    pub fn replace_all<I, S>(&self, patterns: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let next = Arc::new(normalize(patterns));
        let count = next.len();
        *self
            .patterns
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next;
        count
    }

    /// Returns the first pattern contained in `content`, ignoring case.
    pub fn find_match(&self, content: &str) -> Option<String> {
        let patterns = self.current();
        if patterns.is_empty() {
            return None;
        }

        let haystack = content.to_lowercase();
        patterns
            .iter()
            .find(|pattern| haystack.contains(pattern.as_str()))
            .cloned()
    }

    /// True when `content` contains any banned pattern.
    pub fn is_banned(&self, content: &str) -> bool {
        self.find_match(content).is_some()
    }

    /// Snapshot of the active list.
    pub fn current(&self) -> Arc<Vec<String>> {
        self.patterns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current().is_empty()
    }
}

fn normalize<I, S>(patterns: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    patterns
        .into_iter()
        .map(|p| p.as_ref().trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .filter(|p| seen.insert(p.clone()))
        .collect()
}
