//! Token store and session lifecycle
//!
//! [`Session`] is the single writer of the session state. Every transition goes
//! through `watch::Sender::send_modify`/`send_if_modified`, and the persisted
//! copy in [`Storage`] is updated inside the same closure so the two cannot
//! drift apart under concurrent callers.

use anidex_http::client::user;
use anidex_http::types::{RegisterRequest, UserProfile};
use anidex_http::{ApiClient, ClientError};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::SessionConfig;
use crate::cookies::RefreshCookie;
use crate::error::{RefreshError, SessionError, StorageError};
use crate::jwt::{self, RefreshDecision};
use crate::profile_cache::ProfileCache;
use crate::scheduler;
use crate::state::{SessionNotice, SessionPhase, SessionSnapshot};
use crate::storage::Storage;

type SharedRefresh = Shared<BoxFuture<'static, Result<String, RefreshError>>>;

/// Client-side session service
///
/// Cheap to clone; clones share one state. Construct with [`Session::create`]
/// inside a Tokio runtime and call [`Session::dispose`] when done.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    api: ApiClient,
    storage: Arc<dyn Storage>,
    cookie: RefreshCookie,
    config: SessionConfig,
    state: watch::Sender<SessionSnapshot>,
    /// In-flight refresh and the epoch it was started under
    refresh: Mutex<Option<(u64, SharedRefresh)>>,
    profiles: ProfileCache,
    shutdown: CancellationToken,
}

/// Non-owning handle held by the background scheduler
#[derive(Clone)]
pub(crate) struct WeakSession(Weak<Inner>);

impl WeakSession {
    pub(crate) fn upgrade(&self) -> Option<Session> {
        self.0.upgrade().map(|inner| Session { inner })
    }
}

/// Result of one expiry check
#[derive(Debug, Clone)]
pub enum ExpiryCheck {
    NoToken,
    /// Outside the refresh window; `refresh_in` is `None` for tokens without `exp`
    Fresh { refresh_in: Option<Duration> },
    Refreshed,
    /// The refresh failed and the session was torn down
    RefreshFailed(RefreshError),
    /// Already expired; left to the interceptor and boot restoration
    Expired,
    /// The token could not be decoded and the session was torn down
    Invalid,
}

impl Session {
    /// Build the session without starting the background scheduler
    ///
    /// The remember-me flag is read back from storage; the token itself is
    /// only picked up by [`Session::restore`].
    pub fn new(
        api: ApiClient,
        storage: Arc<dyn Storage>,
        cookie: RefreshCookie,
        config: SessionConfig,
    ) -> Self {
        let remember_me = storage
            .get(SessionConfig::REMEMBER_ME_KEY)
            .is_some_and(|v| v == "true");
        let (state, _) = watch::channel(SessionSnapshot::new(remember_me));
        let profiles = ProfileCache::new(config.profile_cache_ttl);

        Self {
            inner: Arc::new(Inner {
                api,
                storage,
                cookie,
                config,
                state,
                refresh: Mutex::new(None),
                profiles,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Build the session and start the refresh scheduler
    pub fn create(
        api: ApiClient,
        storage: Arc<dyn Storage>,
        cookie: RefreshCookie,
        config: SessionConfig,
    ) -> Self {
        let session = Self::new(api, storage, cookie, config);
        scheduler::spawn(session.downgrade(), session.inner.shutdown.child_token());
        session
    }

    /// Stop the background scheduler; the session itself stays usable
    pub fn dispose(&self) {
        debug!("Disposing session");
        self.inner.shutdown.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub(crate) fn downgrade(&self) -> WeakSession {
        WeakSession(Arc::downgrade(&self.inner))
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn refresh_cookie(&self) -> &RefreshCookie {
        &self.inner.cookie
    }

    pub(crate) fn storage(&self) -> &dyn Storage {
        self.inner.storage.as_ref()
    }

    /// Observe every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token().map(str::to_string)
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.inner.state.borrow().user.clone()
    }

    pub fn remember_me(&self) -> bool {
        self.inner.state.borrow().remember_me
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.inner.state.borrow().epoch
    }

    pub(crate) fn set_phase(&self, phase: SessionPhase) {
        self.inner.state.send_modify(|s| s.phase = phase);
    }

    /// Record the persistence preference
    ///
    /// Turning it off also drops a persisted token; turning it on persists the
    /// current one.
    ///
    /// Nothing changes in memory unless storage accepted the new value.
    pub fn set_remember_me(&self, remember_me: bool) -> Result<(), SessionError> {
        let storage = self.inner.storage.as_ref();
        let mut result: Result<(), StorageError> = Ok(());
        self.inner.state.send_if_modified(|s| {
            let previous = s.remember_me;
            let mut next = s.clone();
            next.remember_me = remember_me;
            result = storage
                .set(SessionConfig::REMEMBER_ME_KEY, flag(remember_me))
                .and_then(|()| {
                    persist_token(storage, &next).inspect_err(|_| {
                        let restored = storage.set(SessionConfig::REMEMBER_ME_KEY, flag(previous));
                        if let Err(e) = restored {
                            warn!("Failed to restore the remember-me flag: {}", e);
                        }
                    })
                });
            if result.is_err() {
                return false;
            }
            *s = next;
            true
        });
        Ok(result?)
    }

    /// Replace the access token without fetching a profile
    ///
    /// `None` signs the session out locally without touching the refresh
    /// cookie.
    pub fn set_access_token(&self, token: Option<String>) {
        let storage = &self.inner.storage;
        self.inner.state.send_modify(|s| {
            match token {
                Some(access_token) => {
                    s.phase = SessionPhase::Authenticated { access_token };
                    s.notice = None;
                }
                None => {
                    s.epoch += 1;
                    s.phase = SessionPhase::Anonymous { offline: false };
                    s.user = None;
                }
            }
            if let Err(e) = persist_token(storage.as_ref(), s) {
                warn!("Failed to persist access token: {}", e);
            }
        });
    }

    /// Exchange credentials for a token and sign in with it
    ///
    /// A rejected login (validation error, bad credentials) leaves the current
    /// session untouched and returns the server's message verbatim.
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<Option<UserProfile>, SessionError> {
        let response = self
            .inner
            .api
            .issue_token(username, password, remember_me)
            .await?;

        self.set_remember_me(remember_me)?;
        if let Some(refresh_token) = &response.refresh_token {
            self.inner.cookie.mirror(refresh_token);
        }

        self.login(response.access_token).await
    }

    /// Create an account; does not sign in
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, SessionError> {
        let profile = self.inner.api.register(request).await?;
        info!("Registered account {}", profile.username);
        Ok(profile)
    }

    /// Adopt a freshly issued access token and load the matching profile
    ///
    /// The profile is fetched for the token's `sub` claim. 401, 404 and network
    /// failures tear the session down again; any other failure keeps the
    /// session authenticated without a profile. A token that cannot be decoded
    /// is rejected and tears the session down.
    #[instrument(skip_all)]
    pub async fn login(&self, token: impl Into<String>) -> Result<Option<UserProfile>, SessionError> {
        let token = token.into();
        let claims = match jwt::decode_unverified(&token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!("Rejecting undecodable access token: {}", e);
                self.teardown(Some(SessionNotice::InvalidToken), false);
                return Err(e.into());
            }
        };

        let storage = &self.inner.storage;
        let mut epoch = 0;
        self.inner.state.send_modify(|s| {
            s.epoch += 1;
            epoch = s.epoch;
            s.phase = SessionPhase::Authenticated {
                access_token: token.clone(),
            };
            s.user = None;
            s.notice = None;
            if let Err(e) = persist_token(storage.as_ref(), s) {
                warn!("Failed to persist access token: {}", e);
            }
        });
        info!("Access token installed");

        let Some(username) = claims.sub else {
            debug!("Access token has no subject, skipping profile lookup");
            return Ok(None);
        };
        self.load_profile(epoch, &token, &username).await
    }

    /// Fetch the profile for `username` with `token` and attach it to the
    /// session if it still belongs to `epoch`
    async fn load_profile(
        &self,
        epoch: u64,
        token: &str,
        username: &str,
    ) -> Result<Option<UserProfile>, SessionError> {
        let profile = match self.inner.profiles.get(username) {
            Some(profile) => {
                debug!("Using cached profile for {}", username);
                profile
            }
            None => {
                let request = user::by_username(username);
                match self
                    .inner
                    .api
                    .execute::<UserProfile>(&request, Some(token))
                    .await
                {
                    Ok(profile) => {
                        self.inner.profiles.insert(profile.clone());
                        profile
                    }
                    Err(e) => return self.profile_failed(epoch, e),
                }
            }
        };

        let applied = self.inner.state.send_if_modified(|s| {
            if s.epoch != epoch || !s.is_authenticated() {
                return false;
            }
            s.user = Some(profile.clone());
            true
        });

        if applied {
            info!("Signed in as {}", profile.username);
            Ok(Some(profile))
        } else {
            debug!("Session changed while the profile was loading");
            Err(SessionError::Superseded)
        }
    }

    fn profile_failed(
        &self,
        epoch: u64,
        error: ClientError,
    ) -> Result<Option<UserProfile>, SessionError> {
        let (notice, offline) = if error.is_unauthorized() {
            (SessionNotice::SessionExpired, false)
        } else if error.is_not_found() {
            (SessionNotice::AccountNotFound, false)
        } else if error.is_network() {
            (SessionNotice::Offline, true)
        } else {
            warn!("Profile lookup failed, staying signed in without a profile: {}", error);
            return Ok(None);
        };

        warn!("Profile lookup rejected the session: {}", error);
        self.teardown_at(Some(epoch), Some(notice), offline);
        Err(SessionError::ProfileRejected(error))
    }

    /// Sign out on the server (best effort) and clear every local trace
    ///
    /// Local state is cleared even if the server call fails, times out, or
    /// this future is dropped midway.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let _teardown = LogoutGuard(self);
        let token = self.access_token();
        if let Err(e) = self
            .inner
            .api
            .logout(token.as_deref(), self.inner.config.logout_timeout)
            .await
        {
            warn!("Server-side logout failed, clearing the local session anyway: {}", e);
        }
    }

    /// Clear the token, profile, persisted state and refresh cookie
    pub(crate) fn teardown(&self, notice: Option<SessionNotice>, offline: bool) -> bool {
        self.teardown_at(None, notice, offline)
    }

    /// Tear down only if the session is still at `epoch`
    pub(crate) fn teardown_at(
        &self,
        epoch: Option<u64>,
        notice: Option<SessionNotice>,
        offline: bool,
    ) -> bool {
        let inner = &self.inner;
        let torn_down = inner.state.send_if_modified(|s| {
            if epoch.is_some_and(|e| e != s.epoch) {
                return false;
            }
            s.epoch += 1;
            s.phase = SessionPhase::Anonymous { offline };
            s.user = None;
            s.remember_me = false;
            s.notice = notice;

            for key in [SessionConfig::ACCESS_TOKEN_KEY, SessionConfig::REMEMBER_ME_KEY] {
                if let Err(e) = inner.storage.remove(key) {
                    warn!("Failed to clear {} from storage: {}", key, e);
                }
            }
            inner.profiles.clear();
            inner.cookie.clear();
            inner.cookie.save(inner.storage.as_ref());
            true
        });

        if torn_down {
            info!(?notice, offline, "Session cleared");
        }
        torn_down
    }

    /// Exchange the refresh cookie for a new access token
    ///
    /// Concurrent callers share one request. The request runs on its own task,
    /// so dropping a caller does not abandon it. Any failure tears the session
    /// down before the error is returned.
    pub async fn refresh(&self) -> Result<String, RefreshError> {
        let shared = {
            let mut slot = self.inner.refresh.lock().unwrap_or_else(PoisonError::into_inner);
            let epoch = self.epoch();
            match slot.as_ref() {
                Some((started, pending)) if *started == epoch => {
                    debug!("Joining in-flight refresh");
                    pending.clone()
                }
                _ => {
                    let session = self.clone();
                    let task = tokio::spawn(async move {
                        let result = session.run_refresh(epoch).await;
                        session.finish_refresh(epoch);
                        result
                    });
                    let pending = async move { task.await.unwrap_or(Err(RefreshError::Aborted)) }
                        .boxed()
                        .shared();
                    *slot = Some((epoch, pending.clone()));
                    pending
                }
            }
        };
        shared.await
    }

    /// Whether a refresh is currently running
    pub fn refresh_in_flight(&self) -> bool {
        self.inner
            .refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn finish_refresh(&self, epoch: u64) {
        let mut slot = self.inner.refresh.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|(started, _)| *started == epoch) {
            *slot = None;
        }
    }

    #[instrument(skip(self))]
    async fn run_refresh(&self, epoch: u64) -> Result<String, RefreshError> {
        if !self.inner.cookie.is_present() {
            warn!("No refresh cookie, cannot refresh the session");
            self.teardown_at(Some(epoch), Some(SessionNotice::SessionExpired), false);
            return Err(RefreshError::MissingRefreshToken);
        }

        let response = match self
            .inner
            .api
            .refresh_access_token(self.remember_me())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                let offline = e.is_network();
                let notice = if offline {
                    SessionNotice::Offline
                } else {
                    SessionNotice::SessionExpired
                };
                self.teardown_at(Some(epoch), Some(notice), offline);
                return Err(RefreshError::Request(Arc::new(e)));
            }
        };

        let claims = match jwt::decode_unverified(&response.access_token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!("Refreshed token is undecodable: {}", e);
                self.teardown_at(Some(epoch), Some(SessionNotice::InvalidToken), false);
                return Err(RefreshError::Rejected(e.to_string()));
            }
        };

        if let Some(refresh_token) = &response.refresh_token {
            self.inner.cookie.mirror(refresh_token);
        }

        let storage = &self.inner.storage;
        let adopted = self.inner.state.send_if_modified(|s| {
            if s.epoch != epoch {
                return false;
            }
            s.phase = SessionPhase::Authenticated {
                access_token: response.access_token.clone(),
            };
            s.notice = None;
            if let Err(e) = persist_token(storage.as_ref(), s) {
                warn!("Failed to persist refreshed token: {}", e);
            }
            true
        });
        if !adopted {
            debug!("Session was reset during refresh, discarding the new token");
            return Err(RefreshError::Superseded);
        }
        info!("Access token refreshed");

        let current_user = self.user().map(|u| u.username);
        if let Some(sub) = claims.sub.filter(|sub| current_user.as_deref() != Some(sub.as_str())) {
            if let Err(e) = self
                .load_profile(epoch, &response.access_token, &sub)
                .await
            {
                return Err(match e {
                    SessionError::Superseded => RefreshError::Superseded,
                    other => RefreshError::Rejected(other.to_string()),
                });
            }
        }

        Ok(response.access_token)
    }

    /// Refresh the token if it is about to expire
    ///
    /// An undecodable token tears the session down. Expired tokens are left
    /// alone: the next request's 401 or the next boot deals with them.
    pub async fn check_expiry(&self) -> ExpiryCheck {
        let (token, epoch) = {
            let state = self.inner.state.borrow();
            (state.access_token().map(str::to_string), state.epoch)
        };
        let Some(token) = token else {
            return ExpiryCheck::NoToken;
        };

        let claims = match jwt::decode_unverified(&token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!("Access token is undecodable: {}", e);
                self.teardown_at(Some(epoch), Some(SessionNotice::InvalidToken), false);
                return ExpiryCheck::Invalid;
            }
        };

        match jwt::plan_refresh(claims.exp, jwt::now(), self.inner.config.refresh_lead) {
            RefreshDecision::Fresh { refresh_in } => ExpiryCheck::Fresh { refresh_in },
            RefreshDecision::Expired => ExpiryCheck::Expired,
            RefreshDecision::RefreshDue { expires_in } => {
                info!("Access token expires in {}s, refreshing", expires_in.as_secs());
                match self.refresh().await {
                    Ok(_) => ExpiryCheck::Refreshed,
                    Err(e) => ExpiryCheck::RefreshFailed(e),
                }
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.inner.api.base_url().as_str())
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

fn flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Write the token to storage if remember-me is set, remove it otherwise
fn persist_token(storage: &dyn Storage, state: &SessionSnapshot) -> Result<(), StorageError> {
    match state.access_token() {
        Some(token) if state.remember_me => storage.set(SessionConfig::ACCESS_TOKEN_KEY, token),
        _ => storage.remove(SessionConfig::ACCESS_TOKEN_KEY),
    }
}

struct LogoutGuard<'a>(&'a Session);

impl Drop for LogoutGuard<'_> {
    fn drop(&mut self) {
        self.0.teardown(None, false);
    }
}
