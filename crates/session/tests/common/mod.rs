//! Shared helpers for session integration tests

#![allow(dead_code)]

use anidex_http::ApiClient;
use anidex_session::{MemoryStorage, RefreshCookie, Session, SessionConfig};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::MockServer;

/// Unsigned JWT for `sub` expiring `expires_in` seconds from now
pub fn jwt(sub: &str, expires_in: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + expires_in;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "sub": sub, "exp": exp }).to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

pub fn profile(username: &str) -> Value {
    json!({
        "id": 7,
        "username": username,
        "email": format!("{username}@example.com"),
        "nickname": null,
        "user_avatar": null,
        "user_banner": null
    })
}

pub fn token_body(token: &str) -> Value {
    json!({ "access_token": token, "token_type": "bearer" })
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Session without a background scheduler, so tests drive every refresh
pub fn session_with(base_url: &str, storage: Arc<MemoryStorage>, config: SessionConfig) -> Session {
    let api = ApiClient::new(base_url).unwrap();
    let cookie = RefreshCookie::for_client(&api).unwrap();
    Session::new(api, storage, cookie, config)
}

pub fn session(server: &MockServer) -> (Session, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let session = session_with(&server.uri(), Arc::clone(&storage), SessionConfig::default());
    (session, storage)
}
