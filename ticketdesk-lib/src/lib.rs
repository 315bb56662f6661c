//! Ticket desk API client library
//!
//! An async client for the ticket administration REST API. Requests carry the
//! session's bearer token; when the server rejects it with 401, the client
//! refreshes the token once on behalf of every concurrent request and replays
//! them. A failed refresh tears the session down and hands control to a
//! [`auth::LoginRedirect`].

pub mod api;
pub mod auth;
pub mod error;
pub mod model;

mod client;
mod dispatch;

pub use client::*;
pub use dispatch::ApiRequest;
pub use dispatch::Attempt;
pub use dispatch::DEFAULT_TIMEOUT;
pub use dispatch::FilePart;
pub use dispatch::RequestBody;
