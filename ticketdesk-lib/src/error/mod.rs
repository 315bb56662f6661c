//! Error types

mod api;
mod auth;
mod store;

pub use api::*;
pub use auth::*;
pub use store::*;

/// Top-level error returned by [`TicketDeskClient`](crate::TicketDeskClient) operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request reached the server (or failed on the way) and did not succeed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Login failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The session could not be refreshed and has been torn down.
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// The token store could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    /// Returns the HTTP status code if the server answered with an error status.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api(err) => err.status_code(),
            Self::Auth(AuthError::LoginRejected { status, .. }) => Some(*status),
            Self::Refresh(RefreshError::Rejected { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if the server rejected the presented credential.
    ///
    /// A request that is still unauthorized after one refresh-and-replay
    /// surfaces here.
    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == Some(401)
    }

    /// Returns `true` if the session was torn down and the user must log in again.
    ///
    /// An abandoned refresh leaves the session in place and does not count.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::Refresh(e) if *e != RefreshError::Abandoned)
    }
}
