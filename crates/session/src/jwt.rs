//! Unverified access-token inspection
//!
//! The client has no signing key, so nothing here verifies a signature. Reading
//! `exp` only lets the session refresh ahead of time instead of waiting for a
//! 401; it is not a security boundary. Every authorisation decision stays with
//! the server.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use std::time::Duration;

use crate::error::TokenError;

/// Claims read from the payload segment without verifying the signature
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnverifiedClaims {
    /// Username the token was issued to
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry as a unix timestamp in seconds
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Decode the payload segment of a JWT
pub fn decode_unverified(token: &str) -> Result<UnverifiedClaims, TokenError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Shape);
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// What the refresh scheduler should do about a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDecision {
    /// Nothing to do; `refresh_in` is when the token enters the refresh window
    /// (`None` for tokens without an expiry)
    Fresh { refresh_in: Option<Duration> },
    /// Inside the refresh window: refresh now
    RefreshDue { expires_in: Duration },
    /// Already expired; left to the interceptor and boot restoration
    Expired,
}

/// Decide whether a token with expiry `exp` needs a silent refresh at `now`
pub fn plan_refresh(exp: Option<i64>, now: i64, lead: Duration) -> RefreshDecision {
    let Some(exp) = exp else {
        return RefreshDecision::Fresh { refresh_in: None };
    };

    let remaining = exp - now;
    if remaining <= 0 {
        return RefreshDecision::Expired;
    }

    // Whole seconds: a token exactly `lead` away is due, so `refresh_in` is
    // never zero.
    let remaining = Duration::from_secs(remaining.unsigned_abs());
    if remaining <= lead {
        RefreshDecision::RefreshDue {
            expires_in: remaining,
        }
    } else {
        RefreshDecision::Fresh {
            refresh_in: Some(remaining - lead),
        }
    }
}

/// Current unix time in seconds
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
