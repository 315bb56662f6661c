//! Token store error types

/// Errors raised by [`TokenStore`](crate::auth::TokenStore) implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("corrupt stored value in {field}: {value}")]
    Corrupt { field: &'static str, value: String },
}
