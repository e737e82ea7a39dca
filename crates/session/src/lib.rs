//! Client-side session management for the anidex API
//!
//! [`Session`] owns the access token and everything derived from it. It is an
//! explicitly constructed service: build it with [`Session::create`], hand
//! clones to whoever needs them, observe it through [`Session::subscribe`] and
//! stop its background refresh task with [`Session::dispose`].
//!
//! Outgoing calls go through [`AuthorizedClient`], which attaches the bearer
//! token and recovers from a single expired-token 401 per request.

pub mod boot;
pub mod config;
pub mod cookies;
pub mod error;
pub mod interceptor;
pub mod jwt;
pub mod profile_cache;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod storage;

pub use boot::BootToken;
pub use config::SessionConfig;
pub use cookies::RefreshCookie;
pub use error::{RefreshError, SessionError, StorageError, TokenError};
pub use interceptor::AuthorizedClient;
pub use jwt::{RefreshDecision, UnverifiedClaims, plan_refresh};
pub use session::{ExpiryCheck, Session};
pub use state::{SessionNotice, SessionPhase, SessionSnapshot};
pub use storage::{FileStorage, MemoryStorage, Storage};
