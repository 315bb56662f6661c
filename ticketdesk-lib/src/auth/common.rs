//! Shared authentication utilities

use std::time::Duration;

use log::debug;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

use super::CredentialPair;
use crate::error::AuthError;
use crate::error::RefreshError;

/// Header carrying the refresh token on refresh calls.
pub const REFRESH_TOKEN_HEADER: &str = "X-Refresh-Token";

// =============================================================================
// Endpoints
// =============================================================================

/// Paths of the authentication endpoints.
///
/// Requests to these paths never carry the session's bearer credential and a
/// 401 from them is never answered with a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEndpoints {
    /// Path of the login endpoint.
    pub login: String,
    /// Path of the token refresh endpoint.
    pub refresh: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            login: "/v1/auth/login".to_string(),
            refresh: "/v1/auth/refresh".to_string(),
        }
    }
}

impl AuthEndpoints {
    /// Returns `true` if `path` targets one of the authentication endpoints.
    ///
    /// Query strings and trailing slashes are ignored.
    pub fn is_auth_path(&self, path: &str) -> bool {
        let path = normalize(path);
        path == normalize(&self.login) || path == normalize(&self.refresh)
    }
}

fn normalize(path: &str) -> &str {
    let path = path.split('?').next().unwrap_or(path);
    path.trim_matches('/')
}

/// Joins an API path onto the base URL, keeping any path prefix of the base.
pub(crate) fn endpoint_url(base_url: &Url, path: &str) -> Result<Url, url::ParseError> {
    let base = base_url.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    Url::parse(&format!("{}/{}", base, path))
}

// =============================================================================
// Token Response Parsing
// =============================================================================

/// Token body returned by the login and refresh endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// The token body may arrive bare or wrapped in the API's `data` envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenBody {
    Wrapped { data: TokenResponse },
    Bare(TokenResponse),
}

impl TokenResponse {
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice::<TokenBody>(body).map(|body| match body {
            TokenBody::Wrapped { data } => data,
            TokenBody::Bare(tokens) => tokens,
        })
    }

    /// Builds the replacement pair, keeping `previous_refresh` when the
    /// server did not rotate the refresh token.
    pub fn into_pair(self, previous_refresh: Option<String>) -> CredentialPair {
        CredentialPair {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
        }
    }
}

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Extracts a human-readable message from an error response body.
pub(crate) fn error_message(status: reqwest::StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message)
        .or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string())
}

// =============================================================================
// Token Exchange
// =============================================================================

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Internal helper for the authentication endpoint calls.
///
/// Both calls go straight to the HTTP client: they never pass through the
/// dispatcher and so never carry the session's bearer credential.
pub(crate) struct TokenExchange<'a> {
    pub http_client: &'a reqwest::Client,
    pub base_url: &'a Url,
    pub endpoints: &'a AuthEndpoints,
    pub timeout: Duration,
}

impl TokenExchange<'_> {
    /// Exchanges username and password for a fresh token pair.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, AuthError> {
        let url = endpoint_url(self.base_url, &self.endpoints.login)
            .map_err(|e| AuthError::Parse(format!("invalid login URL: {}", e)))?;

        let response = self
            .http_client
            .post(url)
            .json(&LoginRequest { username, password })
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(AuthError::LoginRejected {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        TokenResponse::from_slice(&body).map_err(|e| AuthError::Parse(e.to_string()))
    }

    /// Exchanges a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, RefreshError> {
        let url = endpoint_url(self.base_url, &self.endpoints.refresh)
            .map_err(|e| RefreshError::Parse(format!("invalid refresh URL: {}", e)))?;

        debug!("calling refresh endpoint {}", url.path());

        let response = self
            .http_client
            .post(url)
            .header(REFRESH_TOKEN_HEADER, refresh_token)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        TokenResponse::from_slice(&body).map_err(|e| RefreshError::Parse(e.to_string()))
    }
}
