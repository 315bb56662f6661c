//! Response envelopes
//!
//! The API wraps most payloads as `{"data": ..., "message": "..."}`, and list
//! endpoints may page their data as `{"content": [...]}`. These helpers peel
//! both layers off so callers see plain values.

use serde::Deserialize;

/// A payload, wrapped in the `data` envelope or bare.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Payload<T> {
    Wrapped(Envelope<T>),
    Bare(T),
}

/// The `{"data": ..., "message": ...}` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Payload<T> {
    /// Returns the payload without its envelope.
    pub fn into_data(self) -> T {
        match self {
            Payload::Wrapped(envelope) => envelope.data,
            Payload::Bare(data) => data,
        }
    }

    /// Returns the server's message, if the payload was wrapped and carried one.
    pub fn message(&self) -> Option<&str> {
        match self {
            Payload::Wrapped(envelope) => envelope.message.as_deref(),
            Payload::Bare(_) => None,
        }
    }
}

/// A list, paged as `{"content": [...]}` or plain.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Paged { content: Vec<T> },
    Plain(Vec<T>),
}

impl<T> Listing<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Paged { content } => content,
            Listing::Plain(items) => items,
        }
    }
}

impl<T> From<Listing<T>> for Vec<T> {
    fn from(listing: Listing<T>) -> Self {
        listing.into_vec()
    }
}
