//! Observable session state

use anidex_http::types::UserProfile;
use std::fmt;

/// Where the session is in its lifecycle
///
/// The access token is carried by [`SessionPhase::Authenticated`], so "has a
/// token" and "is authenticated" cannot disagree.
#[derive(Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing restored or signed in yet
    NoToken,
    /// Boot restoration is running
    Restoring,
    Authenticated {
        access_token: String,
    },
    /// Signed out; `offline` when the server could not be reached
    Anonymous {
        offline: bool,
    },
}

impl SessionPhase {
    pub fn access_token(&self) -> Option<&str> {
        match self {
            Self::Authenticated { access_token } => Some(access_token),
            Self::NoToken | Self::Restoring | Self::Anonymous { .. } => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Anonymous { offline: true })
    }
}

impl fmt::Debug for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoToken => f.write_str("NoToken"),
            Self::Restoring => f.write_str("Restoring"),
            Self::Authenticated { .. } => f
                .debug_struct("Authenticated")
                .field("access_token", &"<redacted>")
                .finish(),
            Self::Anonymous { offline } => f
                .debug_struct("Anonymous")
                .field("offline", offline)
                .finish(),
        }
    }
}

/// Message left for the user after the session changed underneath them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionNotice {
    SessionExpired,
    AccountNotFound,
    InvalidToken,
    Offline,
}

impl SessionNotice {
    pub fn message(self) -> &'static str {
        match self {
            Self::SessionExpired => "Your session has expired. Please sign in again.",
            Self::AccountNotFound => "Your account could not be found. Please sign in again.",
            Self::InvalidToken => "Your saved session is invalid. Please sign in again.",
            Self::Offline => "The server is unreachable. Working offline.",
        }
    }
}

impl fmt::Display for SessionNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Everything an observer of the session can see
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    /// Cached profile of the signed-in user; not authoritative
    pub user: Option<UserProfile>,
    pub remember_me: bool,
    pub notice: Option<SessionNotice>,
    /// Bumped on every teardown; async work started under an older epoch is
    /// discarded when it completes
    pub(crate) epoch: u64,
}

impl SessionSnapshot {
    pub(crate) fn new(remember_me: bool) -> Self {
        Self {
            phase: SessionPhase::NoToken,
            user: None,
            remember_me,
            notice: None,
            epoch: 0,
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.phase.access_token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase.is_authenticated()
    }

    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.username.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticated_follows_token() {
        let mut snapshot = SessionSnapshot::new(false);
        assert!(!snapshot.is_authenticated());
        assert_eq!(snapshot.access_token(), None);

        snapshot.phase = SessionPhase::Authenticated {
            access_token: "abc".into(),
        };
        assert!(snapshot.is_authenticated());
        assert_eq!(snapshot.access_token(), Some("abc"));

        snapshot.phase = SessionPhase::Anonymous { offline: true };
        assert!(!snapshot.is_authenticated());
        assert!(snapshot.phase.is_offline());
    }

    #[test]
    fn test_debug_redacts_token() {
        let phase = SessionPhase::Authenticated {
            access_token: "secret-token".into(),
        };
        let rendered = format!("{phase:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("redacted"));
    }
}
