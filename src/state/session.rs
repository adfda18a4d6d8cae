//! Read-only view of the authentication session.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use crate::net::types::User;

/// Point-in-time copy of the session as seen by consumers.
///
/// Holding a token does not make a session authenticated; only a resolved
/// user does.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSnapshot {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub current_user: Option<User>,
}

impl SessionSnapshot {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current_user.is_some()
    }

    /// True when tokens are stored but no user has been resolved yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.access_token.is_some() && self.current_user.is_none()
    }
}
