//! Main TicketDeskClient

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use log::debug;
use log::info;
use log::warn;
use reqwest::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Acquire;
use crate::auth::AuthEndpoints;
use crate::auth::FailureEscalation;
use crate::auth::LogRedirect;
use crate::auth::LoginRedirect;
use crate::auth::RefreshCoordinator;
use crate::auth::TokenStore;
use crate::auth::common::TokenExchange;
use crate::dispatch::ApiRequest;
use crate::dispatch::Attempt;
use crate::dispatch::DEFAULT_TIMEOUT;
use crate::dispatch::Dispatcher;
use crate::dispatch::decode_payload;
use crate::dispatch::read_payload;
use crate::error::ApiError;
use crate::error::Error;
use crate::error::RefreshError;

/// The main client for the ticket desk API.
///
/// Every request goes through [`send`](Self::send), which attaches the
/// session's access token and transparently refreshes it when the server
/// answers 401: the first request to see the 401 refreshes, concurrent ones
/// wait for that single refresh, and all of them are replayed once with the
/// new token. When the refresh cannot succeed the session is torn down and
/// the configured [`LoginRedirect`] runs.
///
/// This client is cheap to clone (uses `Arc` internally) and clones share the
/// same session and refresh state.
///
/// # Example
///
/// ```ignore
/// use ticketdesk_lib::{TicketDeskClient, auth::MemoryTokenStore};
///
/// let client = TicketDeskClient::builder()
///     .url("https://api.example.com")
///     .token_store(MemoryTokenStore::new())
///     .build()?;
///
/// client.login("admin", "secret").await?;
/// let tickets = client.list_tickets().await?;
/// ```
#[derive(Clone)]
pub struct TicketDeskClient {
    inner: Arc<TicketDeskClientInner>,
}

struct TicketDeskClientInner {
    dispatcher: Dispatcher,
    coordinator: RefreshCoordinator,
    escalation: FailureEscalation,
}

impl TicketDeskClient {
    /// Creates a new builder for constructing a client.
    pub fn builder() -> TicketDeskClientBuilder<Missing, Missing> {
        TicketDeskClientBuilder::new()
    }

    /// Sends a request and decodes its body payload.
    ///
    /// Status line and headers are dropped; an empty body decodes as JSON
    /// `null`, so `()` and `Option<T>` work for bodiless responses.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, Error> {
        let body = self.send_raw(&request).await?;
        Ok(decode_payload(&body)?)
    }

    /// Sends a request and returns the raw body payload.
    pub async fn send_raw(&self, request: &ApiRequest) -> Result<Bytes, Error> {
        let dispatcher = &self.inner.dispatcher;
        let mut attempt = Attempt::first();
        let mut replay_token: Option<String> = None;

        loop {
            let transmission = dispatcher.transmit(request, replay_token.as_deref()).await?;

            let intercept = transmission.response.status() == StatusCode::UNAUTHORIZED
                && attempt.can_replay()
                && !dispatcher.endpoints.is_auth_path(request.path());

            if !intercept {
                return Ok(read_payload(transmission.response).await?);
            }

            debug!(
                "{} {} unauthorized, refreshing credential",
                request.method(),
                request.path()
            );
            let token = self
                .fresh_credential(transmission.credential.as_deref())
                .await?;
            replay_token = Some(token);
            attempt = attempt.replayed();
        }
    }

    /// Obtains the access token to replay with after a 401.
    ///
    /// A caller that arrives while a refresh is in flight waits for it. The
    /// leader checks the store again once it holds the refresh slot: if it
    /// already holds a different token than the one that was rejected, a
    /// refresh finished in the meantime and that token settles the queue.
    async fn fresh_credential(&self, rejected: Option<&str>) -> Result<String, RefreshError> {
        let inner = &self.inner;

        match inner.coordinator.acquire_refresh_or_enqueue() {
            Acquire::Follower(pending) => pending.wait().await,
            Acquire::Leader(guard) => {
                let outcome = match inner.dispatcher.store.access_token() {
                    Some(current) if Some(current.as_str()) != rejected => {
                        debug!("access token already replaced, skipping refresh");
                        Ok(current)
                    }
                    _ => {
                        let outcome = self.perform_refresh().await;
                        if let Err(e) = &outcome {
                            inner.escalation.escalate(e);
                        }
                        outcome
                    }
                };
                let settled = guard.settle(outcome.clone());
                debug!("refresh settled {} queued request(s)", settled);
                outcome
            }
        }
    }

    /// Calls the refresh endpoint and stores the new pair.
    ///
    /// A refresh token restricted to encrypted transport is never sent to a
    /// non-HTTPS API.
    async fn perform_refresh(&self) -> Result<String, RefreshError> {
        let dispatcher = &self.inner.dispatcher;
        let record = dispatcher
            .store
            .refresh_record()
            .ok_or(RefreshError::MissingRefreshToken)?;

        let scheme = dispatcher.base_url.scheme();
        if !record.permits_scheme(scheme) {
            warn!("refusing to send secure refresh token over {}", scheme);
            return Err(RefreshError::InsecureTransport {
                scheme: scheme.to_string(),
            });
        }

        info!("refreshing access token");

        let tokens = self.exchange().refresh(&record.token).await?;
        let pair = tokens.into_pair(Some(record.token));
        dispatcher
            .store
            .store(&pair)
            .map_err(|e| RefreshError::Store(e.to_string()))?;

        info!("access token refreshed");
        Ok(pair.access_token)
    }

    pub(crate) fn exchange(&self) -> TokenExchange<'_> {
        let dispatcher = &self.inner.dispatcher;
        TokenExchange {
            http_client: &dispatcher.http_client,
            base_url: &dispatcher.base_url,
            endpoints: &dispatcher.endpoints,
            timeout: dispatcher.timeout,
        }
    }

    /// Returns the session's token store.
    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.dispatcher.store
    }

    /// Returns the refresh coordinator shared by all clones of this client.
    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    /// Returns the base URL of the API.
    pub fn base_url(&self) -> &Url {
        &self.inner.dispatcher.base_url
    }

    /// Returns the authentication endpoint paths.
    pub fn auth_endpoints(&self) -> &AuthEndpoints {
        &self.inner.dispatcher.endpoints
    }

    /// Returns the per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.inner.dispatcher.timeout
    }
}

// =============================================================================
// Typestate Builder
// =============================================================================

/// Marker type for missing required builder fields.
pub struct Missing;

/// Marker type for set builder fields.
pub struct Set<T>(T);

/// Builder for constructing a [`TicketDeskClient`].
///
/// Uses the typestate pattern to ensure required fields are set at compile time.
///
/// # Required Fields
///
/// - `url` - The API base URL
/// - `token_store` - A [`TokenStore`] implementation
///
/// # Example
///
/// ```ignore
/// let client = TicketDeskClient::builder()
///     .url("https://api.example.com")
///     .token_store(store)
///     .login_redirect(my_redirect)
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// ```
pub struct TicketDeskClientBuilder<U, S> {
    url: U,
    token_store: S,
    endpoints: AuthEndpoints,
    redirect: Arc<dyn LoginRedirect>,
    timeout: Duration,
    http_client: Option<Client>,
}

impl TicketDeskClientBuilder<Missing, Missing> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            url: Missing,
            token_store: Missing,
            endpoints: AuthEndpoints::default(),
            redirect: Arc::new(LogRedirect),
            timeout: DEFAULT_TIMEOUT,
            http_client: None,
        }
    }
}

impl Default for TicketDeskClientBuilder<Missing, Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> TicketDeskClientBuilder<Missing, S> {
    /// Sets the API base URL.
    ///
    /// # Example
    ///
    /// ```ignore
    /// .url("https://api.example.com")
    /// ```
    pub fn url(self, url: impl Into<String>) -> TicketDeskClientBuilder<Set<String>, S> {
        TicketDeskClientBuilder {
            url: Set(url.into()),
            token_store: self.token_store,
            endpoints: self.endpoints,
            redirect: self.redirect,
            timeout: self.timeout,
            http_client: self.http_client,
        }
    }
}

impl<U> TicketDeskClientBuilder<U, Missing> {
    /// Sets the token store holding the session's credentials.
    pub fn token_store<T: TokenStore + 'static>(
        self,
        store: T,
    ) -> TicketDeskClientBuilder<U, Set<Arc<dyn TokenStore>>> {
        self.shared_token_store(Arc::new(store))
    }

    /// Sets a token store that is also held elsewhere.
    pub fn shared_token_store(
        self,
        store: Arc<dyn TokenStore>,
    ) -> TicketDeskClientBuilder<U, Set<Arc<dyn TokenStore>>> {
        TicketDeskClientBuilder {
            url: self.url,
            token_store: Set(store),
            endpoints: self.endpoints,
            redirect: self.redirect,
            timeout: self.timeout,
            http_client: self.http_client,
        }
    }
}

impl<U, S> TicketDeskClientBuilder<U, S> {
    /// Sets the authentication endpoint paths.
    ///
    /// Defaults to `/v1/auth/login` and `/v1/auth/refresh`.
    pub fn auth_endpoints(mut self, endpoints: AuthEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Sets what happens after the session is torn down.
    ///
    /// Defaults to [`LogRedirect`].
    pub fn login_redirect(mut self, redirect: impl LoginRedirect + 'static) -> Self {
        self.redirect = Arc::new(redirect);
        self
    }

    /// Sets the timeout applied to every call, refresh calls included.
    ///
    /// Defaults to 10 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets a custom HTTP client.
    ///
    /// If not set, a default client will be created.
    pub fn http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }
}

impl TicketDeskClientBuilder<Set<String>, Set<Arc<dyn TokenStore>>> {
    /// Builds the [`TicketDeskClient`].
    ///
    /// This method is only available when both `url` and `token_store` have been set.
    pub fn build(self) -> Result<TicketDeskClient, ApiError> {
        let base_url =
            Url::parse(&self.url.0).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", self.url.0, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(self.url.0));
        }

        let http_client = match self.http_client {
            Some(client) => client,
            None => Client::builder().timeout(self.timeout).build()?,
        };

        let store = self.token_store.0;
        let escalation = FailureEscalation::new(store.clone(), self.redirect);

        Ok(TicketDeskClient {
            inner: Arc::new(TicketDeskClientInner {
                dispatcher: Dispatcher {
                    base_url,
                    http_client,
                    timeout: self.timeout,
                    endpoints: self.endpoints,
                    store,
                },
                coordinator: RefreshCoordinator::new(),
                escalation,
            }),
        })
    }
}
