//! Login, logout and persistence tests against a mock API server.

mod common;

use std::time::Duration;

use common::Harness;
use common::accepts;
use common::refresh_succeeds;
use common::rejects;
use common::tickets_body;
use serde_json::json;
use ticketdesk_lib::TicketDeskClient;
use ticketdesk_lib::auth::CredentialPair;
use ticketdesk_lib::auth::RefreshCookiePolicy;
use ticketdesk_lib::auth::SqliteTokenStore;
use ticketdesk_lib::auth::TokenStore;
use ticketdesk_lib::error::AuthError;
use ticketdesk_lib::error::Error;
use wiremock::Mock;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_json;
use wiremock::matchers::method;
use wiremock::matchers::path;

#[tokio::test]
async fn test_login_stores_pair_and_role() {
    let h = Harness::with_pair(CredentialPair::new("stale")).await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/login"))
        .and(body_json(json!({"username": "admin", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"accessToken": "T1", "refreshToken": "R1", "role": "ADMIN"}
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    h.client.login("admin", "secret").await.unwrap();

    assert!(h.client.is_logged_in());
    assert_eq!(h.access_token().as_deref(), Some("T1"));
    assert_eq!(h.refresh_token().as_deref(), Some("R1"));
    assert_eq!(h.client.role().as_deref(), Some("ADMIN"));

    let requests = h.server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_rejected_login_is_not_refreshed() {
    let h = Harness::logged_in().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "bad credentials"})),
        )
        .expect(1)
        .mount(&h.server)
        .await;
    refresh_succeeds(Duration::ZERO)
        .expect(0)
        .mount(&h.server)
        .await;

    let err = h.client.login("admin", "wrong").await.unwrap_err();

    assert!(matches!(
        err,
        Error::Auth(AuthError::LoginRejected { status: 401, ref message }) if message == "bad credentials"
    ));
    assert_eq!(h.redirect.count(), 0);
    assert_eq!(h.access_token().as_deref(), Some("T1"));
}

#[tokio::test]
async fn test_logout_clears_session() {
    let h = Harness::logged_in().await;
    h.store
        .begin_session(&CredentialPair::with_refresh("T1", "R1"), Some("ADMIN"))
        .unwrap();

    h.client.logout().await.unwrap();

    assert!(!h.client.is_logged_in());
    assert_eq!(h.refresh_token(), None);
    assert_eq!(h.client.role(), None);
    assert_eq!(h.redirect.count(), 0);
}

#[tokio::test]
async fn test_refreshed_pair_persists_in_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("session.db");
    let server = wiremock::MockServer::start().await;

    rejects("GET", "/v1/tickets", "T1").mount(&server).await;
    accepts("GET", "/v1/tickets", "T2", tickets_body())
        .mount(&server)
        .await;
    refresh_succeeds(Duration::ZERO)
        .expect(1)
        .mount(&server)
        .await;

    {
        let store = SqliteTokenStore::open(&db, &server.uri())
            .unwrap()
            .with_policy(RefreshCookiePolicy::default().secure(false));
        store
            .store(&CredentialPair::with_refresh("T1", "R1"))
            .unwrap();

        let client = TicketDeskClient::builder()
            .url(server.uri())
            .token_store(store)
            .build()
            .unwrap();
        client.list_tickets().await.unwrap();
    }

    let reopened = SqliteTokenStore::open(&db, &server.uri()).unwrap();
    assert_eq!(reopened.access_token().as_deref(), Some("T2"));
    assert_eq!(reopened.refresh_token().as_deref(), Some("R2"));
}
