//! Authorised request path
//!
//! [`AuthorizedClient`] attaches the session's bearer token and recovers from
//! an expired token at most once per request: on 401 it waits for the shared
//! refresh, replays the request with the new token, and tears the session down
//! if the replay is rejected as well. Connection failures get a few paced
//! retries of their own.

use anidex_http::client::{anime, auth, comments, lists, user};
use anidex_http::types::{
    Anime, AnimeFilters, AnimeListResponse, AnimeSaveList, Comment, ListName, NewComment,
    UserProfile,
};
use anidex_http::{ApiClient, ApiRequest, ClientError, FileUpload};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::session::Session;
use crate::state::SessionNotice;

/// API client bound to a [`Session`]
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    session: Session,
}

impl AuthorizedClient {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn api(&self) -> &ApiClient {
        self.session.api()
    }

    /// Send with the current token, refreshing and replaying once on 401
    ///
    /// When the refresh fails the original 401 response is returned; the
    /// session has already been torn down by then. A 401 for a token that has
    /// since been replaced is replayed with the current one without another
    /// refresh. Requests that never reach the server are retried separately,
    /// see [`SessionConfig::network_retries`](crate::SessionConfig).
    pub async fn send(&self, request: &ApiRequest) -> Result<Response, ClientError> {
        let sent = self.session.access_token();
        let response = self.send_reachable(request, sent.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let token = match self.session.access_token() {
            Some(current) if sent.as_deref() != Some(current.as_str()) => {
                debug!(path = %request.path(), "Token changed while the request was in flight");
                current
            }
            _ if sent.is_none() && !self.session.refresh_cookie().is_present() => {
                debug!(path = %request.path(), "Unauthorised without a session, nothing to refresh");
                return Ok(response);
            }
            _ => {
                debug!(path = %request.path(), "Got 401, refreshing the access token");
                match self.session.refresh().await {
                    Ok(token) => token,
                    Err(e) => {
                        warn!("Refresh after 401 failed: {}", e);
                        return Ok(response);
                    }
                }
            }
        };
        let epoch = self.session.epoch();

        let replay = self.send_reachable(request, Some(&token)).await?;
        if replay.status() == StatusCode::UNAUTHORIZED {
            warn!(path = %request.path(), "Refreshed token was rejected as well, signing out");
            self.session
                .teardown_at(Some(epoch), Some(SessionNotice::SessionExpired), false);
        }
        Ok(replay)
    }

    /// Send once, retrying connection failures with a linearly growing pause
    ///
    /// Once the retries are spent an authenticated session is signed out as
    /// offline and the network error is returned.
    async fn send_reachable(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let config = self.session.config();
        let mut attempt = 0;
        loop {
            match self.api().send(request, token).await {
                Err(e) if e.is_network() && attempt < config.network_retries => {
                    attempt += 1;
                    let pause = config.network_retry_step * attempt;
                    warn!(
                        path = %request.path(),
                        attempt,
                        "Server unreachable, retrying in {}ms",
                        pause.as_millis()
                    );
                    sleep(pause).await;
                }
                Err(e) if e.is_network() => {
                    if self.session.is_authenticated() {
                        warn!(path = %request.path(), "Server still unreachable, signing out");
                        self.session.teardown(Some(SessionNotice::Offline), true);
                    }
                    return Err(e);
                }
                other => return other,
            }
        }
    }

    pub async fn execute<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ClientError> {
        ApiClient::decode(self.send(request).await?).await
    }

    pub async fn execute_unit(&self, request: &ApiRequest) -> Result<(), ClientError> {
        ApiClient::check(self.send(request).await?).await.map(|_| ())
    }

    // Users

    pub async fn user_by_username(&self, username: &str) -> Result<UserProfile, ClientError> {
        self.execute(&user::by_username(username)).await
    }

    pub async fn user_by_id(&self, id: &str) -> Result<UserProfile, ClientError> {
        self.execute(&user::by_id(id)).await
    }

    pub async fn search_users(&self, username: &str) -> Result<Vec<UserProfile>, ClientError> {
        self.execute(&user::search(username)).await
    }

    /// User behind the session cookie; a 404 means the account is gone and
    /// ends the session
    pub async fn current_session_user(&self) -> Result<UserProfile, ClientError> {
        let result = self.execute(&auth::current_session()).await;
        if let Err(e) = &result
            && e.is_not_found()
        {
            info!("Current account no longer exists, signing out");
            self.session
                .teardown(Some(SessionNotice::AccountNotFound), false);
        }
        result
    }

    pub async fn update_avatar(&self, upload: FileUpload) -> Result<UserProfile, ClientError> {
        self.execute(&user::update_avatar(upload)).await
    }

    pub async fn update_banner(&self, upload: FileUpload) -> Result<UserProfile, ClientError> {
        self.execute(&user::update_banner(upload)).await
    }

    pub async fn update_nickname(&self, nickname: &str) -> Result<UserProfile, ClientError> {
        self.execute(&user::update_nickname(nickname)).await
    }

    // Catalogue

    pub async fn anime_list(&self, filters: &AnimeFilters) -> Result<AnimeListResponse, ClientError> {
        self.execute(&anime::filtered(filters)).await
    }

    pub async fn anime_by_id(&self, id: &str) -> Result<Anime, ClientError> {
        self.execute(&anime::by_id(id)).await
    }

    pub async fn anime_by_name(&self, name: &str) -> Result<AnimeListResponse, ClientError> {
        self.execute(&anime::by_name(name)).await
    }

    // Anime lists

    /// Contents of a list, creating it on first access
    pub async fn save_list(&self, name: ListName) -> Result<AnimeSaveList, ClientError> {
        match self.execute(&lists::by_name(name)).await {
            Err(e) if e.is_not_found() => {
                debug!("List {} does not exist yet, creating it", name);
                self.execute_unit(&lists::create(name)).await?;
                Ok(AnimeSaveList::default())
            }
            other => other,
        }
    }

    pub async fn add_to_list(&self, name: ListName, anime_id: u64) -> Result<(), ClientError> {
        self.execute_unit(&lists::add_anime(name, anime_id)).await
    }

    pub async fn remove_from_lists(&self, anime_id: u64) -> Result<(), ClientError> {
        self.execute_unit(&lists::remove_anime(anime_id)).await
    }

    pub async fn clear_lists(&self) -> Result<(), ClientError> {
        self.execute_unit(&lists::clear_all()).await
    }

    // Comments

    pub async fn comments_for_anime(&self, anime_id: &str) -> Result<Vec<Comment>, ClientError> {
        self.execute(&comments::for_anime(anime_id)).await
    }

    pub async fn latest_comments(&self) -> Result<Vec<Comment>, ClientError> {
        self.execute(&comments::latest()).await
    }

    pub async fn post_comment(&self, comment: &NewComment) -> Result<Comment, ClientError> {
        self.execute(&comments::create(comment)).await
    }

    pub async fn edit_comment(&self, comment_id: &str, text: &str) -> Result<Comment, ClientError> {
        self.execute(&comments::update(comment_id, text)).await
    }

    pub async fn like_comment(&self, comment_id: &str) -> Result<(), ClientError> {
        self.execute_unit(&comments::like(comment_id)).await
    }

    pub async fn dislike_comment(&self, comment_id: &str) -> Result<(), ClientError> {
        self.execute_unit(&comments::dislike(comment_id)).await
    }
}
