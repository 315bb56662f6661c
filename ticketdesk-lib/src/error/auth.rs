//! Authentication error types

/// Errors that can occur while logging in.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The login endpoint refused the credentials.
    #[error("Login rejected with HTTP {status}: {message}")]
    LoginRejected { status: u16, message: String },

    /// Network error during authentication.
    #[error("Network error during auth: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to parse authentication response.
    #[error("Auth response parse error: {0}")]
    Parse(String),

    /// The issued tokens could not be stored.
    #[error("Failed to store issued tokens: {0}")]
    Store(#[from] super::StoreError),
}

/// Why a token refresh failed.
///
/// Every caller queued behind a refresh receives a copy of the same error,
/// so this type is `Clone` and carries no foreign error sources.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    /// The token store held no (unexpired) refresh token.
    #[error("No refresh token available")]
    MissingRefreshToken,

    /// The refresh endpoint answered with a non-success status.
    #[error("Refresh rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The refresh call failed in transport (unreachable, timeout).
    #[error("Network error during refresh: {0}")]
    Network(String),

    /// The refresh token is restricted to encrypted transport and the API
    /// is not served over HTTPS.
    #[error("Refresh token may not be sent over {scheme}")]
    InsecureTransport { scheme: String },

    /// The refresh response did not contain an access token.
    #[error("Refresh response parse error: {0}")]
    Parse(String),

    /// The new tokens could not be persisted.
    #[error("Failed to persist refreshed tokens: {0}")]
    Store(String),

    /// The task performing the refresh was dropped before it settled.
    #[error("Refresh abandoned before completion")]
    Abandoned,
}

impl From<reqwest::Error> for RefreshError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
