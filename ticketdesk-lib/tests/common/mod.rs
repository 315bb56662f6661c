//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::json;
use ticketdesk_lib::TicketDeskClient;
use ticketdesk_lib::auth::CredentialPair;
use ticketdesk_lib::auth::LoginRedirect;
use ticketdesk_lib::auth::MemoryTokenStore;
use ticketdesk_lib::auth::RefreshCookiePolicy;
use ticketdesk_lib::auth::TokenStore;
use ticketdesk_lib::error::RefreshError;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;

/// Counts how often the session was sent back to login.
#[derive(Clone, Default)]
pub struct CountingRedirect {
    count: Arc<AtomicUsize>,
}

impl CountingRedirect {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl LoginRedirect for CountingRedirect {
    fn redirect_to_login(&self, _cause: &RefreshError) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub server: MockServer,
    pub store: Arc<MemoryTokenStore>,
    pub redirect: CountingRedirect,
    pub client: TicketDeskClient,
}

impl Harness {
    /// A client whose session holds `pair`.
    pub async fn with_pair(pair: CredentialPair) -> Self {
        Self::build(pair, Duration::from_secs(5)).await
    }

    /// The usual session: access token `T1`, refresh token `R1`.
    pub async fn logged_in() -> Self {
        Self::with_pair(CredentialPair::with_refresh("T1", "R1")).await
    }

    /// The usual session under the default refresh-token policy, which keeps
    /// the refresh token off plain HTTP.
    pub async fn with_default_policy() -> Self {
        Self::build_with_policy(
            CredentialPair::with_refresh("T1", "R1"),
            Duration::from_secs(5),
            RefreshCookiePolicy::default(),
        )
        .await
    }

    /// The mock server speaks plain HTTP, so the refresh record is not secure.
    pub async fn build(pair: CredentialPair, timeout: Duration) -> Self {
        Self::build_with_policy(pair, timeout, RefreshCookiePolicy::default().secure(false)).await
    }

    pub async fn build_with_policy(
        pair: CredentialPair,
        timeout: Duration,
        policy: RefreshCookiePolicy,
    ) -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryTokenStore::with_policy(policy));
        store.store(&pair).unwrap();
        let redirect = CountingRedirect::default();

        let client = TicketDeskClient::builder()
            .url(server.uri())
            .shared_token_store(store.clone())
            .login_redirect(redirect.clone())
            .timeout(timeout)
            .build()
            .unwrap();

        Self {
            server,
            store,
            redirect,
            client,
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.access_token()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store.refresh_token()
    }
}

/// Answers 401 to requests for `route` carrying `Bearer {token}`.
pub fn rejects(verb: &str, route: &str, token: &str) -> Mock {
    Mock::given(method(verb))
        .and(path(route))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "token expired"})),
        )
}

/// Answers 200 with `body` to requests for `route` carrying `Bearer {token}`.
pub fn accepts(verb: &str, route: &str, token: &str, body: serde_json::Value) -> Mock {
    Mock::given(method(verb))
        .and(path(route))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
}

/// A refresh endpoint that trades `R1` for `T2`/`R2` after `delay`.
pub fn refresh_succeeds(delay: Duration) -> Mock {
    Mock::given(method("POST"))
        .and(path("/v1/auth/refresh"))
        .and(header("x-refresh-token", "R1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(delay)
                .set_body_json(json!({
                    "data": {"accessToken": "T2", "refreshToken": "R2"},
                    "message": "refreshed"
                })),
        )
}

/// A refresh endpoint that rejects the refresh token.
pub fn refresh_fails(delay: Duration) -> Mock {
    Mock::given(method("POST"))
        .and(path("/v1/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_delay(delay)
                .set_body_json(json!({"message": "refresh token revoked"})),
        )
}

pub fn tickets_body() -> serde_json::Value {
    json!({
        "data": {"content": [{"id": 1, "title": "Summer Fest", "status": 1}]},
        "message": "ok"
    })
}
