//! Background refresh scheduler driven against a mock server

mod common;

use anidex_http::ApiClient;
use anidex_session::{MemoryStorage, RefreshCookie, Session, SessionConfig};
use common::{jwt, profile, token_body};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Session with its scheduler running
fn scheduled_session(server: &MockServer, config: SessionConfig) -> Session {
    let api = ApiClient::new(server.uri()).unwrap();
    let cookie = RefreshCookie::for_client(&api).unwrap();
    cookie.mirror("r1");
    Session::create(api, Arc::new(MemoryStorage::new()), cookie, config)
}

async fn mount_refresh(server: &MockServer, token: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(token)))
        .expect(times)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/get-user-by-username/mika"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile("mika")))
        .mount(server)
        .await;
}

async fn wait_for_token(session: &Session, token: &str, within: Duration) {
    let mut updates = session.subscribe();
    tokio::time::timeout(
        within,
        updates.wait_for(|s| s.access_token() == Some(token)),
    )
    .await
    .expect("token was not replaced in time")
    .unwrap();
}

#[tokio::test]
async fn test_token_set_inside_window_is_refreshed_once() {
    let mock_server = MockServer::start().await;
    let refreshed = jwt("mika", 3600);
    mount_refresh(&mock_server, &refreshed, 1).await;

    let session = scheduled_session(&mock_server, SessionConfig::default());
    // Scheduler is idle with no token; the new token must wake it
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.set_access_token(Some(jwt("mika", 60)));

    wait_for_token(&session, &refreshed, Duration::from_secs(5)).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(session.is_authenticated());
    assert_eq!(session.user().map(|u| u.username).as_deref(), Some("mika"));
    session.dispose();
}

#[tokio::test]
async fn test_refresh_waits_for_window() {
    let mock_server = MockServer::start().await;
    let refreshed = jwt("mika", 3600);
    mount_refresh(&mock_server, &refreshed, 1).await;

    let config = SessionConfig::default().with_refresh_lead(Duration::from_secs(1));
    let session = scheduled_session(&mock_server, config);
    let initial = jwt("mika", 3);
    session.set_access_token(Some(initial.clone()));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(session.access_token().as_deref(), Some(initial.as_str()));

    wait_for_token(&session, &refreshed, Duration::from_secs(5)).await;
    session.dispose();
}

#[tokio::test]
async fn test_token_exactly_at_lead_is_refreshed_once() {
    let mock_server = MockServer::start().await;
    let refreshed = jwt("mika", 3600);
    mount_refresh(&mock_server, &refreshed, 1).await;

    let config = SessionConfig::default().with_refresh_lead(Duration::from_secs(300));
    let session = scheduled_session(&mock_server, config);
    session.set_access_token(Some(jwt("mika", 300)));

    wait_for_token(&session, &refreshed, Duration::from_secs(5)).await;
    session.dispose();
}

#[tokio::test]
async fn test_short_lived_tokens_are_paced_by_check_interval() {
    let mock_server = MockServer::start().await;
    // Every refreshed token lands inside the window again
    mount_refresh(&mock_server, &jwt("mika", 30), 1).await;

    let session = scheduled_session(&mock_server, SessionConfig::default());
    session.set_access_token(Some(jwt("mika", 60)));

    tokio::time::sleep(Duration::from_millis(500)).await;
    session.dispose();
}
