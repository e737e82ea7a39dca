//! Authentication API client methods
//!
//! These calls are made without going through a session: token issue and
//! refresh authenticate with credentials or the refresh cookie, not a bearer.

use super::{ApiClient, ClientError};
use crate::client::request::ApiRequest;
use crate::types::{RegisterRequest, TokenResponse, UserProfile};
use std::time::Duration;

/// `POST /auth/token?remember_me=`
pub fn issue_token(username: &str, password: &str, remember_me: bool) -> ApiRequest {
    ApiRequest::post(["auth", "token"])
        .query("remember_me", remember_me)
        .form(vec![("username", username), ("password", password)])
}

/// `GET /auth/refresh-token?remember_me=`; the refresh token travels as a cookie
pub fn refresh_token(remember_me: bool) -> ApiRequest {
    ApiRequest::get(["auth", "refresh-token"]).query("remember_me", remember_me)
}

/// `POST /auth/logout`
pub fn logout(timeout: Duration) -> ApiRequest {
    ApiRequest::post(["auth", "logout"]).timeout(timeout)
}

/// `GET /auth/get-cookies`: the user behind the current session cookie
pub fn current_session() -> ApiRequest {
    ApiRequest::get(["auth", "get-cookies"])
}

impl ApiClient {
    /// Exchange credentials for an access token
    pub async fn issue_token(
        &self,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<TokenResponse, ClientError> {
        self.execute(&issue_token(username, password, remember_me), None)
            .await
    }

    /// Exchange the refresh cookie for a new access token
    pub async fn refresh_access_token(
        &self,
        remember_me: bool,
    ) -> Result<TokenResponse, ClientError> {
        self.execute(&refresh_token(remember_me), None).await
    }

    /// Tell the server to drop the session; callers usually ignore the result
    pub async fn logout(&self, bearer: Option<&str>, timeout: Duration) -> Result<(), ClientError> {
        self.execute_unit(&logout(timeout), bearer).await
    }

    /// Create a new account
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ClientError> {
        let req = ApiRequest::post(["user", "create-user"]).json(request)?;
        self.execute(&req, None).await
    }
}
