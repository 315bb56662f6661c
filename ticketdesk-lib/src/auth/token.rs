//! TokenStore trait and credential types

use std::sync::PoisonError;
use std::sync::RwLock;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;

use crate::error::StoreError;

/// The access/refresh token pair of one client session.
///
/// Issued at login and replaced as a whole by every successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPair {
    /// The bearer token attached to API calls.
    pub access_token: String,
    /// The token used solely to obtain a new access token.
    pub refresh_token: Option<String>,
}

impl CredentialPair {
    /// Creates a pair without a refresh token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
        }
    }

    /// Creates a pair with both tokens.
    pub fn with_refresh(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: Some(refresh_token.into()),
        }
    }

    /// Returns `true` if a refresh token is available.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }
}

/// Same-site restriction applied to the stored refresh token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    #[default]
    Strict,
    Lax,
    None,
}

impl SameSite {
    /// Convert to string for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "strict",
            SameSite::Lax => "lax",
            SameSite::None => "none",
        }
    }

    /// Parse from database string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "strict" => Some(SameSite::Strict),
            "lax" => Some(SameSite::Lax),
            "none" => Some(SameSite::None),
            _ => None,
        }
    }
}

/// Storage policy for refresh tokens.
///
/// Refresh tokens are kept in a cookie-like record with an explicit expiry,
/// restricted to encrypted transport and same-site use.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use ticketdesk_lib::auth::RefreshCookiePolicy;
///
/// let policy = RefreshCookiePolicy::default();
/// assert_eq!(policy.ttl, Duration::from_secs(7 * 24 * 60 * 60));
/// assert!(policy.secure);
/// ```
#[derive(Debug, Clone)]
pub struct RefreshCookiePolicy {
    /// How long a stored refresh token stays readable.
    pub ttl: Duration,
    /// Only send over encrypted connections.
    pub secure: bool,
    /// Same-site restriction.
    pub same_site: SameSite,
}

impl Default for RefreshCookiePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(7 * 24 * 60 * 60), // 7 days
            secure: true,
            same_site: SameSite::Strict,
        }
    }
}

impl RefreshCookiePolicy {
    /// Sets the lifetime of stored refresh tokens.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets whether stored refresh tokens may only travel over HTTPS.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Wraps a refresh token in a record that expires `ttl` from now.
    pub fn issue(&self, token: impl Into<String>) -> RefreshCookie {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::zero());
        RefreshCookie {
            token: token.into(),
            expires_at: Utc::now() + ttl,
            secure: self.secure,
            same_site: self.same_site,
        }
    }
}

/// A stored refresh token with its transport restrictions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshCookie {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub secure: bool,
    pub same_site: SameSite,
}

impl RefreshCookie {
    /// Returns `true` if the record is past its expiry.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns `true` if the token may be sent to a URL with `scheme`.
    pub fn permits_scheme(&self, scheme: &str) -> bool {
        !self.secure || scheme.eq_ignore_ascii_case("https")
    }
}

/// Everything one session keeps between requests.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionState {
    pub access_token: Option<String>,
    pub refresh: Option<RefreshCookie>,
    pub role: Option<String>,
}

impl SessionState {
    pub fn live_refresh(&self) -> Option<RefreshCookie> {
        self.refresh.clone().filter(|cookie| !cookie.is_expired())
    }

    /// Swaps in `pair`. A refresh token that did not change keeps its record,
    /// expiry included; only a new token gets a fresh record.
    pub fn replace(&mut self, pair: &CredentialPair, policy: &RefreshCookiePolicy) {
        self.access_token = Some(pair.access_token.clone());
        self.refresh = match (&pair.refresh_token, self.refresh.take()) {
            (Some(token), Some(cookie)) if cookie.token == *token => Some(cookie),
            (Some(token), _) => Some(policy.issue(token)),
            (None, _) => None,
        };
    }

    /// Starts a new session: the pair and the role marker, nothing kept from before.
    pub fn begin(&mut self, pair: &CredentialPair, role: Option<&str>, policy: &RefreshCookiePolicy) {
        self.refresh = None;
        self.replace(pair, policy);
        self.role = role.map(str::to_string);
    }
}

/// Persistence for the session's credentials.
///
/// Reads and writes are short and synchronous: the client calls them on every
/// request and in the middle of a refresh, and a reader must never observe a
/// half-written pair.
///
/// Implementations are responsible for:
/// - Keeping the access token scoped to the session (cleared on logout)
/// - Keeping the refresh token under the [`RefreshCookiePolicy`], reporting an
///   expired one as absent
/// - Replacing both tokens atomically in [`store`](TokenStore::store)
pub trait TokenStore: Send + Sync {
    /// Returns the current access token.
    fn access_token(&self) -> Option<String>;

    /// Returns the current refresh-token record, if present and unexpired.
    fn refresh_record(&self) -> Option<RefreshCookie>;

    /// Returns the current refresh token, if present and unexpired.
    fn refresh_token(&self) -> Option<String> {
        self.refresh_record().map(|cookie| cookie.token)
    }

    /// Returns the cached user-role marker.
    fn role(&self) -> Option<String>;

    /// Replaces the stored pair. A pair without a refresh token removes it.
    fn store(&self, pair: &CredentialPair) -> Result<(), StoreError>;

    /// Replaces the whole session with `pair` and the user-role marker in one write.
    fn begin_session(&self, pair: &CredentialPair, role: Option<&str>) -> Result<(), StoreError>;

    /// Deletes both tokens and every session marker.
    fn clear(&self) -> Result<(), StoreError>;
}

/// A token store that keeps the session in memory.
///
/// Useful for tests and for processes that log in on every start.
///
/// # Example
///
/// ```
/// use ticketdesk_lib::auth::{CredentialPair, MemoryTokenStore, TokenStore};
///
/// let store = MemoryTokenStore::new();
/// store.store(&CredentialPair::with_refresh("access", "refresh")).unwrap();
/// assert_eq!(store.access_token().as_deref(), Some("access"));
/// ```
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    state: RwLock<SessionState>,
    policy: RefreshCookiePolicy,
}

impl MemoryTokenStore {
    /// Creates an empty store with the default refresh-token policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with a custom refresh-token policy.
    pub fn with_policy(policy: RefreshCookiePolicy) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            policy,
        }
    }

    /// Creates a store that already holds the given pair.
    pub fn from_pair(pair: &CredentialPair) -> Self {
        let store = Self::new();
        store.write().replace(pair, &store.policy);
        store
    }

    /// Returns the stored refresh-token record, including an expired one.
    pub fn refresh_cookie(&self) -> Option<RefreshCookie> {
        self.read().refresh.clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    fn refresh_record(&self) -> Option<RefreshCookie> {
        self.read().live_refresh()
    }

    fn role(&self) -> Option<String> {
        self.read().role.clone()
    }

    fn store(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        self.write().replace(pair, &self.policy);
        Ok(())
    }

    fn begin_session(&self, pair: &CredentialPair, role: Option<&str>) -> Result<(), StoreError> {
        self.write().begin(pair, role, &self.policy);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.write() = SessionState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_replaces_pair() {
        let store = MemoryTokenStore::new();
        store.store(&CredentialPair::with_refresh("a1", "r1")).unwrap();
        store.store(&CredentialPair::with_refresh("a2", "r2")).unwrap();

        assert_eq!(store.access_token().as_deref(), Some("a2"));
        assert_eq!(store.refresh_token().as_deref(), Some("r2"));
    }

    #[test]
    fn test_pair_without_refresh_removes_it() {
        let store = MemoryTokenStore::from_pair(&CredentialPair::with_refresh("a1", "r1"));
        store.store(&CredentialPair::new("a2")).unwrap();

        assert_eq!(store.access_token().as_deref(), Some("a2"));
        assert_eq!(store.refresh_token(), None);
    }

    #[test]
    fn test_refresh_cookie_policy_applied() {
        let store = MemoryTokenStore::from_pair(&CredentialPair::with_refresh("a", "r"));
        let cookie = store.refresh_cookie().unwrap();

        assert!(cookie.secure);
        assert_eq!(cookie.same_site, SameSite::Strict);
        let lifetime = cookie.expires_at - Utc::now();
        assert!(lifetime > chrono::Duration::days(6));
        assert!(lifetime <= chrono::Duration::days(7));
    }

    #[test]
    fn test_unrotated_refresh_token_keeps_its_expiry() {
        let store = MemoryTokenStore::from_pair(&CredentialPair::with_refresh("a1", "r1"));
        let issued = store.refresh_cookie().unwrap();

        std::thread::sleep(Duration::from_millis(20));
        store.store(&CredentialPair::with_refresh("a2", "r1")).unwrap();

        assert_eq!(store.access_token().as_deref(), Some("a2"));
        assert_eq!(store.refresh_cookie(), Some(issued));
    }

    #[test]
    fn test_rotated_refresh_token_gets_a_new_record() {
        let store = MemoryTokenStore::from_pair(&CredentialPair::with_refresh("a1", "r1"));
        let first = store.refresh_cookie().unwrap();

        std::thread::sleep(Duration::from_millis(20));
        store.store(&CredentialPair::with_refresh("a2", "r2")).unwrap();

        let second = store.refresh_cookie().unwrap();
        assert_eq!(second.token, "r2");
        assert!(second.expires_at > first.expires_at);
    }

    #[test]
    fn test_secure_record_only_permits_https() {
        let secure = RefreshCookiePolicy::default().issue("r");
        assert!(secure.permits_scheme("https"));
        assert!(!secure.permits_scheme("http"));

        let plain = RefreshCookiePolicy::default().secure(false).issue("r");
        assert!(plain.permits_scheme("http"));
    }

    #[test]
    fn test_begin_session_replaces_role() {
        let store = MemoryTokenStore::new();
        store
            .begin_session(&CredentialPair::with_refresh("a1", "r1"), Some("admin"))
            .unwrap();
        store.begin_session(&CredentialPair::new("a2"), None).unwrap();

        assert_eq!(store.access_token().as_deref(), Some("a2"));
        assert_eq!(store.refresh_token(), None);
        assert_eq!(store.role(), None);
    }

    #[test]
    fn test_expired_refresh_token_reads_as_absent() {
        let store = MemoryTokenStore::with_policy(RefreshCookiePolicy::default().ttl(Duration::ZERO));
        store.store(&CredentialPair::with_refresh("a", "r")).unwrap();

        assert_eq!(store.access_token().as_deref(), Some("a"));
        assert_eq!(store.refresh_token(), None);
        assert!(store.refresh_cookie().is_some());
    }

    #[test]
    fn test_clear_removes_everything() {
        let store = MemoryTokenStore::new();
        store
            .begin_session(&CredentialPair::with_refresh("a", "r"), Some("admin"))
            .unwrap();
        store.clear().unwrap();

        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
        assert_eq!(store.role(), None);
    }

    #[test]
    fn test_same_site_round_trips_through_strings() {
        for value in [SameSite::Strict, SameSite::Lax, SameSite::None] {
            assert_eq!(SameSite::parse(value.as_str()), Some(value));
        }
        assert_eq!(SameSite::parse("bogus"), None);
    }
}
