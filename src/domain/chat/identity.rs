//! Identity of the user behind a connection.

use serde::Serialize;

use crate::domain::foundation::{UserId, Username, ValidationError};

/// `{ user_id, username }` as supplied by the login collaborator.
///
/// Not verified here beyond non-emptiness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: UserId,
    pub username: Username,
}

impl Identity {
    pub fn new(user_id: UserId, username: Username) -> Self {
        Self { user_id, username }
    }

    /// Builds an identity from raw strings, rejecting blanks.
    pub fn parse(user_id: &str, username: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            user_id: UserId::new(user_id)?,
            username: Username::new(username)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_valid_identity() {
        let identity = Identity::parse("u1", "alice").unwrap();
        assert_eq!(identity.user_id.as_str(), "u1");
        assert_eq!(identity.username.as_str(), "alice");
    }

    #[test]
    fn parse_rejects_blank_username() {
        let err = Identity::parse("u1", " ").unwrap_err();
        assert_eq!(err, ValidationError::empty_field("username"));
    }
}
