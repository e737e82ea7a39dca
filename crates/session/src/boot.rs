//! Boot-time session restoration

use tracing::{info, instrument, warn};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::jwt::{self, RefreshDecision};
use crate::session::Session;
use crate::state::{SessionNotice, SessionPhase};
use crate::storage::Storage;

/// What the previous run left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootToken {
    /// No token, or remember-me was off
    NoToken,
    Fresh(String),
    Expired,
    Invalid,
}

impl BootToken {
    /// Classify a persisted token at unix time `now`
    pub fn classify(token: Option<&str>, remember_me: bool, now: i64) -> Self {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Self::NoToken;
        };
        if !remember_me {
            return Self::NoToken;
        }

        match jwt::decode_unverified(token) {
            Ok(claims) => match jwt::plan_refresh(claims.exp, now, std::time::Duration::ZERO) {
                RefreshDecision::Expired => Self::Expired,
                RefreshDecision::Fresh { .. } | RefreshDecision::RefreshDue { .. } => {
                    Self::Fresh(token.to_string())
                }
            },
            Err(_) => Self::Invalid,
        }
    }

    /// Read and classify whatever is in `storage`
    pub fn load(storage: &dyn Storage, now: i64) -> Self {
        let remember_me = storage
            .get(SessionConfig::REMEMBER_ME_KEY)
            .is_some_and(|v| v == "true");
        let token = storage.get(SessionConfig::ACCESS_TOKEN_KEY);
        Self::classify(token.as_deref(), remember_me, now)
    }
}

impl Session {
    /// Restore the previous session, giving up after `boot_timeout`
    ///
    /// Never fails: anything that cannot be restored ends in
    /// [`SessionPhase::Anonymous`], with `offline` set when the server could not
    /// be reached in time. Work still running at the timeout is discarded.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> SessionPhase {
        self.set_phase(SessionPhase::Restoring);
        let timeout = self.config().boot_timeout;

        match tokio::time::timeout(timeout, self.restore_inner()).await {
            Ok(()) => {}
            Err(_) => {
                warn!("Session restoration timed out after {:?}", timeout);
                self.teardown(Some(SessionNotice::Offline), true);
            }
        }

        let phase = self.snapshot().phase;
        let phase = match phase {
            SessionPhase::Restoring | SessionPhase::NoToken => {
                let anonymous = SessionPhase::Anonymous { offline: false };
                self.set_phase(anonymous.clone());
                anonymous
            }
            other => other,
        };
        info!(
            authenticated = phase.is_authenticated(),
            offline = phase.is_offline(),
            "Session restoration finished"
        );
        phase
    }

    async fn restore_inner(&self) {
        match BootToken::load(self.storage(), jwt::now()) {
            BootToken::NoToken => {
                info!("No persisted session");
                if let Err(e) = self.storage().remove(SessionConfig::ACCESS_TOKEN_KEY) {
                    warn!("Failed to clear persisted token: {}", e);
                }
            }
            BootToken::Fresh(token) => match self.login(token).await {
                Ok(_) => {}
                Err(SessionError::ProfileRejected(e)) => {
                    info!("Persisted session was rejected: {}", e);
                }
                Err(e) => warn!("Failed to restore persisted session: {}", e),
            },
            BootToken::Expired => {
                info!("Persisted token expired, trying the refresh cookie");
                if let Err(e) = self.refresh().await {
                    info!("Could not refresh the persisted session: {}", e);
                }
            }
            BootToken::Invalid => {
                warn!("Persisted token is malformed, discarding it");
                self.teardown(Some(SessionNotice::InvalidToken), false);
            }
        }
    }
}
