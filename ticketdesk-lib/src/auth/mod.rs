//! Authentication

pub(crate) mod common;
mod escalation;
mod refresh;
mod sqlite;
mod token;

pub use common::AuthEndpoints;
pub use common::REFRESH_TOKEN_HEADER;
pub use escalation::LogRedirect;
pub use escalation::LoginRedirect;
pub(crate) use escalation::FailureEscalation;
pub use refresh::Acquire;
pub use refresh::PendingRefresh;
pub use refresh::RefreshCoordinator;
pub use refresh::RefreshGuard;
pub use refresh::RefreshOutcome;
pub use sqlite::SqliteTokenStore;
pub use token::CredentialPair;
pub use token::MemoryTokenStore;
pub use token::RefreshCookie;
pub use token::RefreshCookiePolicy;
pub use token::SameSite;
pub use token::TokenStore;
