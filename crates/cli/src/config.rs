//! CLI configuration
//!
//! Sources, later ones winning: built-in defaults, an optional TOML/JSON file,
//! then `ANIDEX_*` environment variables with `__` between nested keys
//! (`ANIDEX_API__BASE_URL`, `ANIDEX_SESSION__BOOT_TIMEOUT_SECS`).

use anidex_session::SessionConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiSettings,
    pub session: SessionSettings,
    /// Where the session file lives; defaults to the platform data directory
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    pub refresh_lead_secs: u64,
    pub check_interval_secs: u64,
    pub boot_timeout_secs: u64,
    pub profile_cache_ttl_secs: u64,
    pub logout_timeout_secs: u64,
    pub network_retries: u32,
    pub network_retry_step_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            api: ApiSettings {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: anidex_http::client::DEFAULT_TIMEOUT.as_secs(),
                user_agent: None,
            },
            session: SessionSettings {
                refresh_lead_secs: session.refresh_lead.as_secs(),
                check_interval_secs: session.check_interval.as_secs(),
                boot_timeout_secs: session.boot_timeout.as_secs(),
                profile_cache_ttl_secs: session.profile_cache_ttl.as_secs(),
                logout_timeout_secs: session.logout_timeout.as_secs(),
                network_retries: session.network_retries,
                network_retry_step_secs: session.network_retry_step.as_secs(),
            },
            state_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, `file` and the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.timeout_secs", defaults.api.timeout_secs)?
            .set_default(
                "session.refresh_lead_secs",
                defaults.session.refresh_lead_secs,
            )?
            .set_default(
                "session.check_interval_secs",
                defaults.session.check_interval_secs,
            )?
            .set_default(
                "session.boot_timeout_secs",
                defaults.session.boot_timeout_secs,
            )?
            .set_default(
                "session.profile_cache_ttl_secs",
                defaults.session.profile_cache_ttl_secs,
            )?
            .set_default(
                "session.logout_timeout_secs",
                defaults.session.logout_timeout_secs,
            )?
            .set_default("session.network_retries", defaults.session.network_retries)?
            .set_default(
                "session.network_retry_step_secs",
                defaults.session.network_retry_step_secs,
            )?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("ANIDEX")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| match file {
                Some(path) => format!("Failed to load configuration from {}", path.display()),
                None => "Failed to load configuration".to_string(),
            })?;

        Ok(settings.try_deserialize()?)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_refresh_lead(Duration::from_secs(self.session.refresh_lead_secs))
            .with_check_interval(Duration::from_secs(self.session.check_interval_secs))
            .with_boot_timeout(Duration::from_secs(self.session.boot_timeout_secs))
            .with_profile_cache_ttl(Duration::from_secs(self.session.profile_cache_ttl_secs))
            .with_logout_timeout(Duration::from_secs(self.session.logout_timeout_secs))
            .with_network_retry(
                self.session.network_retries,
                Duration::from_secs(self.session.network_retry_step_secs),
            )
    }

    /// Resolve the state directory: explicit override, configured value, then
    /// the platform data directory
    pub fn state_dir(&self, overridden: Option<PathBuf>) -> PathBuf {
        overridden
            .or_else(|| self.state_dir.clone())
            .unwrap_or_else(|| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("anidex")
            })
    }
}
