//! Session configuration

use std::time::Duration;

/// Timing knobs of the session manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Refresh silently once the token has less than this left
    pub refresh_lead: Duration,
    /// Lower bound between two scheduled expiry checks
    pub check_interval: Duration,
    /// Boot restoration gives up and goes offline after this long
    pub boot_timeout: Duration,
    /// How long a fetched profile is reused
    pub profile_cache_ttl: Duration,
    /// Server-side logout is abandoned after this long
    pub logout_timeout: Duration,
    /// Extra attempts for a request that never reached the server
    pub network_retries: u32,
    /// Pause before the first network retry; the n-th retry waits n times this
    pub network_retry_step: Duration,
}

impl SessionConfig {
    /// Storage key for the persisted access token
    pub const ACCESS_TOKEN_KEY: &'static str = "access_token";

    /// Storage key for the remember-me flag (`"true"` / `"false"`)
    pub const REMEMBER_ME_KEY: &'static str = "rememberMe";

    /// Storage key for a snapshot of the refresh cookie between process runs
    pub const REFRESH_COOKIE_KEY: &'static str = "refresh_token";

    /// Lifetime given to a refresh cookie mirrored from a response body
    pub const REFRESH_COOKIE_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

    #[must_use]
    pub fn with_refresh_lead(mut self, lead: Duration) -> Self {
        self.refresh_lead = lead;
        self
    }

    #[must_use]
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    #[must_use]
    pub fn with_boot_timeout(mut self, timeout: Duration) -> Self {
        self.boot_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_profile_cache_ttl(mut self, ttl: Duration) -> Self {
        self.profile_cache_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_logout_timeout(mut self, timeout: Duration) -> Self {
        self.logout_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_network_retry(mut self, retries: u32, step: Duration) -> Self {
        self.network_retries = retries;
        self.network_retry_step = step;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_lead: Duration::from_secs(5 * 60),
            check_interval: Duration::from_secs(60),
            boot_timeout: Duration::from_secs(5),
            profile_cache_ttl: Duration::from_secs(5 * 60),
            logout_timeout: Duration::from_secs(3),
            network_retries: 3,
            network_retry_step: Duration::from_secs(1),
        }
    }
}
