//! Refresh-token cookie adapter
//!
//! The refresh token is server-issued and lives in the HTTP client's cookie
//! jar. The session only asks whether it exists, mirrors a token that arrives
//! in a response body, and clears it on teardown. Clearing is best effort: a
//! cookie the server scoped to a path we do not know about may survive.

use anidex_http::client::auth;
use anidex_http::{ApiClient, ClientError};
use reqwest::cookie::{CookieStore, Jar};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::config::SessionConfig;
use crate::storage::Storage;

const COOKIE_NAME: &str = "refresh_token";

/// Paths a refresh cookie may have been scoped to: the one we mirror with and
/// the default path of a cookie set by an `/auth/*` response
const COOKIE_PATHS: [&str; 2] = ["/", "/auth"];

/// Handle on the `refresh_token` cookie inside a shared jar
#[derive(Clone)]
pub struct RefreshCookie {
    jar: Arc<Jar>,
    url: Url,
}

impl RefreshCookie {
    /// Cookie as the client will send it to the refresh endpoint
    pub fn for_client(api: &ApiClient) -> Result<Self, ClientError> {
        let url = api.url_for(&auth::refresh_token(false))?;
        Ok(Self {
            jar: api.cookie_jar(),
            url,
        })
    }

    /// Current cookie value, if the jar would send one
    pub fn value(&self) -> Option<String> {
        let header = self.jar.cookies(&self.url)?;
        let header = header.to_str().ok()?;
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == COOKIE_NAME && !value.is_empty())
            .map(|(_, value)| value.to_string())
    }

    pub fn is_present(&self) -> bool {
        self.value().is_some()
    }

    /// Store a refresh token received in a response body
    pub fn mirror(&self, value: &str) {
        self.clear();
        let cookie = format!(
            "{COOKIE_NAME}={value}; Max-Age={}; Path=/; SameSite=Lax",
            SessionConfig::REFRESH_COOKIE_MAX_AGE.as_secs()
        );
        self.jar.add_cookie_str(&cookie, &self.url);
        debug!("Mirrored refresh token into the cookie jar");
    }

    /// Expire the cookie on every path it is known to use
    pub fn clear(&self) {
        for path in COOKIE_PATHS {
            self.jar
                .add_cookie_str(&format!("{COOKIE_NAME}=; Max-Age=0; Path={path}"), &self.url);
        }
    }

    /// Copy the cookie into durable storage so the next process can restore it
    pub fn save(&self, storage: &dyn Storage) {
        let result = match self.value() {
            Some(value) => storage.set(SessionConfig::REFRESH_COOKIE_KEY, &value),
            None => storage.remove(SessionConfig::REFRESH_COOKIE_KEY),
        };
        if let Err(e) = result {
            warn!("Failed to persist refresh cookie: {}", e);
        }
    }

    /// Restore a cookie saved by [`RefreshCookie::save`]
    pub fn load(&self, storage: &dyn Storage) -> bool {
        match storage.get(SessionConfig::REFRESH_COOKIE_KEY) {
            Some(value) if !value.is_empty() => {
                self.mirror(&value);
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for RefreshCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCookie")
            .field("url", &self.url.as_str())
            .field("present", &self.is_present())
            .finish()
    }
}
