//! Sign-in, logout and silent refresh against a mock API

mod common;

use anidex_http::types::RegisterRequest;
use anidex_session::{
    ExpiryCheck, RefreshError, SessionConfig, SessionError, SessionNotice, SessionPhase, Storage,
};
use common::{bearer, jwt, profile, session, token_body};
use futures::future::join_all;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_sign_in_stores_token_and_fetches_profile() {
    let mock_server = MockServer::start().await;
    let token = jwt("mika", 3600);

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .and(query_param("remember_me", "true"))
        .and(body_string_contains("username=mika"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body(&token))
                .append_header("set-cookie", "refresh_token=r1; Path=/; HttpOnly; SameSite=Lax"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user/get-user-by-username/mika"))
        .and(header("authorization", bearer(&token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile("mika")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (session, storage) = session(&mock_server);
    let mut updates = session.subscribe();

    let user = session.sign_in("mika", "hunter2", true).await.unwrap();

    assert_eq!(user.unwrap().username, "mika");
    assert!(session.is_authenticated());
    assert_eq!(session.access_token().as_deref(), Some(token.as_str()));
    assert_eq!(session.user().unwrap().id, "7");
    assert_eq!(
        storage.get(SessionConfig::ACCESS_TOKEN_KEY).as_deref(),
        Some(token.as_str())
    );
    assert_eq!(
        storage.get(SessionConfig::REMEMBER_ME_KEY).as_deref(),
        Some("true")
    );
    assert!(session.refresh_cookie().is_present());

    assert!(updates.has_changed().unwrap());
    assert_eq!(updates.borrow_and_update().username(), Some("mika"));
}

#[tokio::test]
async fn test_sign_in_without_remember_me_keeps_token_in_memory() {
    let mock_server = MockServer::start().await;
    let token = jwt("mika", 3600);

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(&token)))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/get-user-by-username/mika"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile("mika")))
        .mount(&mock_server)
        .await;

    let (session, storage) = session(&mock_server);
    session.sign_in("mika", "hunter2", false).await.unwrap();

    assert!(session.is_authenticated());
    assert_eq!(storage.get(SessionConfig::ACCESS_TOKEN_KEY), None);
    assert_eq!(
        storage.get(SessionConfig::REMEMBER_ME_KEY).as_deref(),
        Some("false")
    );
}

#[tokio::test]
async fn test_sign_in_validation_error_leaves_session_untouched() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({"detail": [{"msg": "field required"}]})),
        )
        .mount(&mock_server)
        .await;

    let (session, _) = session(&mock_server);
    let err = session.sign_in("", "", true).await.unwrap_err();

    match err {
        SessionError::Api(e) => assert_eq!(e.user_message(), "field required"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(session.snapshot().phase, SessionPhase::NoToken);
    assert!(!session.remember_me());
}

#[tokio::test]
async fn test_sign_in_mirrors_body_refresh_token() {
    let mock_server = MockServer::start().await;
    let token = jwt("mika", 3600);

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "token_type": "bearer",
            "refresh_token": "from-body"
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/get-user-by-username/mika"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile("mika")))
        .mount(&mock_server)
        .await;

    let (session, _) = session(&mock_server);
    session.sign_in("mika", "hunter2", true).await.unwrap();

    assert_eq!(
        session.refresh_cookie().value().as_deref(),
        Some("from-body")
    );
}

#[tokio::test]
async fn test_login_profile_not_found_tears_down() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/get-user-by-username/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "User not found"})))
        .mount(&mock_server)
        .await;

    let (session, storage) = session(&mock_server);
    session.set_remember_me(true).unwrap();
    let result = session.login(jwt("ghost", 3600)).await;

    assert!(matches!(result, Err(SessionError::ProfileRejected(_))));
    assert!(!session.is_authenticated());
    assert_eq!(session.user(), None);
    assert_eq!(session.snapshot().notice, Some(SessionNotice::AccountNotFound));
    assert_eq!(storage.get(SessionConfig::ACCESS_TOKEN_KEY), None);
}

#[tokio::test]
async fn test_login_profile_unauthorized_tears_down() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/get-user-by-username/mika"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let (session, _) = session(&mock_server);
    let result = session.login(jwt("mika", 3600)).await;

    assert!(matches!(result, Err(SessionError::ProfileRejected(_))));
    assert!(!session.is_authenticated());
    assert_eq!(session.snapshot().notice, Some(SessionNotice::SessionExpired));
}

#[tokio::test]
async fn test_login_profile_server_error_stays_signed_in() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/get-user-by-username/mika"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let (session, _) = session(&mock_server);
    let user = session.login(jwt("mika", 3600)).await.unwrap();

    assert_eq!(user, None);
    assert!(session.is_authenticated());
    assert_eq!(session.user(), None);
}

#[tokio::test]
async fn test_profile_is_cached_between_logins() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/get-user-by-username/mika"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile("mika")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (session, _) = session(&mock_server);
    session.login(jwt("mika", 3600)).await.unwrap();
    let again = session.login(jwt("mika", 7200)).await.unwrap();

    assert_eq!(again.unwrap().username, "mika");
}

#[tokio::test]
async fn test_logout_clears_state_when_server_fails() {
    let mock_server = MockServer::start().await;
    let token = jwt("mika", 3600);

    Mock::given(method("GET"))
        .and(path("/user/get-user-by-username/mika"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile("mika")))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("authorization", bearer(&token).as_str()))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (session, storage) = session(&mock_server);
    session.set_remember_me(true).unwrap();
    session.refresh_cookie().mirror("r1");
    session.login(token).await.unwrap();

    session.logout().await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.access_token(), None);
    assert!(!snapshot.is_authenticated());
    assert_eq!(snapshot.user, None);
    assert_eq!(snapshot.notice, None);
    assert_eq!(storage.get(SessionConfig::ACCESS_TOKEN_KEY), None);
    assert_eq!(storage.get(SessionConfig::REMEMBER_ME_KEY), None);
    assert!(!session.refresh_cookie().is_present());
}

#[tokio::test]
async fn test_logout_clears_state_when_server_hangs() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let storage = std::sync::Arc::new(anidex_session::MemoryStorage::new());
    let session = common::session_with(
        &mock_server.uri(),
        storage,
        SessionConfig::default().with_logout_timeout(Duration::from_millis(100)),
    );
    session.set_access_token(Some(jwt("mika", 3600)));

    tokio::time::timeout(Duration::from_secs(2), session.logout())
        .await
        .expect("logout should give up on the server quickly");

    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_register_surfaces_server_detail() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/create-user"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Username already taken"})),
        )
        .mount(&mock_server)
        .await;

    let (session, _) = session(&mock_server);
    let err = session
        .register(&RegisterRequest {
            username: "mika".into(),
            email: "mika@example.com".into(),
            password: "hunter22".into(),
            confirm_password: "hunter22".into(),
        })
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Username already taken"));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_concurrent_refreshes_share_one_request() {
    let mock_server = MockServer::start().await;
    let refreshed = jwt("mika", 3600);

    Mock::given(method("GET"))
        .and(path("/auth/refresh-token"))
        .and(header("cookie", "refresh_token=r1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body(&refreshed))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/get-user-by-username/mika"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile("mika")))
        .mount(&mock_server)
        .await;

    let (session, _) = session(&mock_server);
    session.refresh_cookie().mirror("r1");
    session.set_access_token(Some(jwt("mika", 60)));

    let results = join_all((0..5).map(|_| session.refresh())).await;
    let check = session.check_expiry().await;

    for result in results {
        assert_eq!(result.unwrap(), refreshed);
    }
    assert!(matches!(check, ExpiryCheck::Fresh { .. }));
    assert_eq!(session.access_token().as_deref(), Some(refreshed.as_str()));
    assert!(!session.refresh_in_flight());
}

#[tokio::test]
async fn test_expiring_token_is_refreshed_once() {
    let mock_server = MockServer::start().await;
    let refreshed = jwt("mika", 3600);

    Mock::given(method("GET"))
        .and(path("/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body(&refreshed))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/get-user-by-username/mika"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile("mika")))
        .mount(&mock_server)
        .await;

    let (session, _) = session(&mock_server);
    session.refresh_cookie().mirror("r1");
    session.set_access_token(Some(jwt("mika", 120)));

    let checks = join_all((0..3).map(|_| session.check_expiry())).await;

    assert!(checks.iter().all(|c| matches!(c, ExpiryCheck::Refreshed)));
    assert_eq!(session.access_token().as_deref(), Some(refreshed.as_str()));
    assert_eq!(session.user().unwrap().username, "mika");
}

#[tokio::test]
async fn test_token_far_from_expiry_is_not_refreshed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(&jwt("mika", 3600))))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (session, _) = session(&mock_server);
    session.refresh_cookie().mirror("r1");
    session.set_access_token(Some(jwt("mika", 301)));

    assert!(matches!(
        session.check_expiry().await,
        ExpiryCheck::Fresh { refresh_in: Some(_) }
    ));
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_refresh_failure_tears_down() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Refresh token expired"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (session, storage) = session(&mock_server);
    session.set_remember_me(true).unwrap();
    session.refresh_cookie().mirror("stale");
    session.set_access_token(Some(jwt("mika", 30)));

    let result = session.refresh().await;

    assert!(matches!(result, Err(RefreshError::Request(_))));
    assert!(!session.is_authenticated());
    assert_eq!(session.user(), None);
    assert_eq!(session.snapshot().notice, Some(SessionNotice::SessionExpired));
    assert_eq!(storage.get(SessionConfig::ACCESS_TOKEN_KEY), None);
    assert_eq!(storage.get(SessionConfig::REMEMBER_ME_KEY), None);
    assert!(!session.refresh_cookie().is_present());
}

#[tokio::test]
async fn test_refresh_result_is_discarded_after_logout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/refresh-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body(&jwt("mika", 3600)))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let (session, _) = session(&mock_server);
    session.refresh_cookie().mirror("r1");
    session.set_access_token(Some(jwt("mika", 30)));

    let refresh = tokio::spawn({
        let session = session.clone();
        async move { session.refresh().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.logout().await;

    let result = refresh.await.unwrap();
    assert!(matches!(result, Err(RefreshError::Superseded)));
    assert!(!session.is_authenticated());
}
