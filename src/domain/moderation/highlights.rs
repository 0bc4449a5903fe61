//! Highlighted usernames and their display colours.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::foundation::Username;

/// Refreshable `username -> color` map from the admin highlight list.
#[derive(Debug, Default)]
pub struct HighlightedUsers {
    colors: RwLock<Arc<HashMap<String, String>>>,
}

impl HighlightedUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically swaps the whole map. Entries with a blank name or colour
    /// are skipped. Returns the number of active entries.
    pub fn replace_all(&self, colors: HashMap<String, String>) -> usize {
        let next: HashMap<String, String> = colors
            .into_iter()
            .filter_map(|(name, color)| {
                let name = name.trim().to_string();
                let color = color.trim().to_string();
                (!name.is_empty() && !color.is_empty()).then_some((name, color))
            })
            .collect();
        let count = next.len();
        *self.colors.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        count
    }

    /// Colour for a username, if it is highlighted.
    pub fn color_for(&self, username: &Username) -> Option<String> {
        self.colors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(username.as_str())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.colors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Username {
        Username::new(s).unwrap()
    }

    #[test]
    fn unknown_user_has_no_color() {
        let highlights = HighlightedUsers::new();
        assert_eq!(highlights.color_for(&name("alice")), None);
    }

    #[test]
    fn replace_all_installs_colors() {
        let highlights = HighlightedUsers::new();
        let count = highlights.replace_all(HashMap::from([
            ("alice".to_string(), "#ff0000".to_string()),
            ("bob".to_string(), " ".to_string()),
        ]));

        assert_eq!(count, 1);
        assert_eq!(highlights.color_for(&name("alice")), Some("#ff0000".to_string()));
        assert_eq!(highlights.color_for(&name("bob")), None);
    }

    #[test]
    fn replace_all_drops_previous_entries() {
        let highlights = HighlightedUsers::new();
        highlights.replace_all(HashMap::from([("alice".to_string(), "red".to_string())]));
        highlights.replace_all(HashMap::from([("bob".to_string(), "blue".to_string())]));

        assert_eq!(highlights.color_for(&name("alice")), None);
        assert_eq!(highlights.color_for(&name("bob")), Some("blue".to_string()));
    }
}
