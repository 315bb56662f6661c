//! SQLite token store.

use std::path::Path;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::RwLock;

use chrono::DateTime;
use chrono::Utc;
use rusqlite::Connection;
use rusqlite::OptionalExtension;

use super::token::SessionState;
use super::CredentialPair;
use super::RefreshCookie;
use super::RefreshCookiePolicy;
use super::SameSite;
use super::TokenStore;
use crate::error::StoreError;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS session_tokens (
        origin TEXT PRIMARY KEY,
        access_token TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS refresh_cookies (
        origin TEXT PRIMARY KEY,
        token TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        secure INTEGER NOT NULL,
        same_site TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS session_markers (
        origin TEXT NOT NULL,
        name TEXT NOT NULL,
        value TEXT NOT NULL,
        PRIMARY KEY (origin, name)
    );
";

const ROLE_MARKER: &str = "role";

/// SQLite-backed token storage that survives process restarts.
///
/// The session is keyed by origin (the API base URL), so one database can
/// hold sessions for several deployments. The access token and the refresh
/// token live in separate tables; the refresh token carries the expiry and
/// transport flags of its [`RefreshCookiePolicy`].
///
/// Reads are served from an in-memory snapshot loaded at open time. Writes go
/// to the database in one transaction and only then replace the snapshot, so
/// readers see either the old pair or the new one.
pub struct SqliteTokenStore {
    conn: Mutex<Connection>,
    snapshot: RwLock<SessionState>,
    origin: String,
    policy: RefreshCookiePolicy,
}

impl SqliteTokenStore {
    /// Opens (or creates) the store at `path` for the given origin.
    pub fn open(path: impl AsRef<Path>, origin: impl Into<String>) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?, origin.into(), RefreshCookiePolicy::default())
    }

    /// Opens a store that only lives as long as the process.
    pub fn open_in_memory(origin: impl Into<String>) -> Result<Self, StoreError> {
        Self::from_connection(
            Connection::open_in_memory()?,
            origin.into(),
            RefreshCookiePolicy::default(),
        )
    }

    /// Replaces the policy applied to refresh tokens written from now on.
    pub fn with_policy(mut self, policy: RefreshCookiePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the origin this store is scoped to.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the stored refresh-token record, including an expired one.
    pub fn refresh_cookie(&self) -> Option<RefreshCookie> {
        self.read().refresh.clone()
    }

    fn from_connection(
        conn: Connection,
        origin: String,
        policy: RefreshCookiePolicy,
    ) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        let state = load_state(&conn, &origin)?;

        Ok(Self {
            conn: Mutex::new(conn),
            snapshot: RwLock::new(state),
            origin,
            policy,
        })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `write` against the database, then swaps in `next` as the snapshot.
    fn commit(
        &self,
        next: SessionState,
        write: impl FnOnce(&rusqlite::Transaction<'_>) -> Result<(), rusqlite::Error>,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn.transaction()?;
        write(&tx)?;
        tx.commit()?;

        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = next;
        Ok(())
    }
}

fn load_state(conn: &Connection, origin: &str) -> Result<SessionState, StoreError> {
    let access_token: Option<String> = conn
        .query_row(
            "SELECT access_token FROM session_tokens WHERE origin = ?",
            [origin],
            |row| row.get(0),
        )
        .optional()?;

    let refresh_row: Option<(String, String, bool, String)> = conn
        .query_row(
            "SELECT token, expires_at, secure, same_site FROM refresh_cookies WHERE origin = ?",
            [origin],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?;

    let refresh = match refresh_row {
        Some((token, expires_at, secure, same_site)) => Some(RefreshCookie {
            token,
            expires_at: DateTime::parse_from_rfc3339(&expires_at)
                .map_err(|_| StoreError::Corrupt {
                    field: "expires_at",
                    value: expires_at.clone(),
                })?
                .with_timezone(&Utc),
            secure,
            same_site: SameSite::parse(&same_site).ok_or(StoreError::Corrupt {
                field: "same_site",
                value: same_site.clone(),
            })?,
        }),
        None => None,
    };

    let role: Option<String> = conn
        .query_row(
            "SELECT value FROM session_markers WHERE origin = ? AND name = ?",
            [origin, ROLE_MARKER],
            |row| row.get(0),
        )
        .optional()?;

    Ok(SessionState {
        access_token,
        refresh,
        role,
    })
}

fn write_pair(
    tx: &rusqlite::Transaction<'_>,
    origin: &str,
    access_token: &str,
    cookie: Option<&RefreshCookie>,
) -> Result<(), rusqlite::Error> {
    tx.execute(
        "INSERT OR REPLACE INTO session_tokens (origin, access_token) VALUES (?, ?)",
        rusqlite::params![origin, access_token],
    )?;
    match cookie {
        Some(cookie) => {
            tx.execute(
                "INSERT OR REPLACE INTO refresh_cookies
                    (origin, token, expires_at, secure, same_site)
                 VALUES (?, ?, ?, ?, ?)",
                rusqlite::params![
                    origin,
                    &cookie.token,
                    cookie.expires_at.to_rfc3339(),
                    cookie.secure,
                    cookie.same_site.as_str(),
                ],
            )?;
        }
        None => {
            tx.execute("DELETE FROM refresh_cookies WHERE origin = ?", [origin])?;
        }
    }
    Ok(())
}

impl TokenStore for SqliteTokenStore {
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
        let mut next = self.read().clone();
        next.replace(pair, &self.policy);

        let origin = self.origin.as_str();
        let cookie = next.refresh.clone();
        self.commit(next, |tx| write_pair(tx, origin, &pair.access_token, cookie.as_ref()))
    }

    fn begin_session(&self, pair: &CredentialPair, role: Option<&str>) -> Result<(), StoreError> {
        let mut next = SessionState::default();
        next.begin(pair, role, &self.policy);

        let origin = self.origin.as_str();
        let cookie = next.refresh.clone();
        self.commit(next, |tx| {
            write_pair(tx, origin, &pair.access_token, cookie.as_ref())?;
            match role {
                Some(role) => tx.execute(
                    "INSERT OR REPLACE INTO session_markers (origin, name, value) VALUES (?, ?, ?)",
                    rusqlite::params![origin, ROLE_MARKER, role],
                )?,
                None => tx.execute(
                    "DELETE FROM session_markers WHERE origin = ? AND name = ?",
                    [origin, ROLE_MARKER],
                )?,
            };
            Ok(())
        })
    }

    fn clear(&self) -> Result<(), StoreError> {
        let origin = self.origin.as_str();
        self.commit(SessionState::default(), |tx| {
            tx.execute("DELETE FROM session_tokens WHERE origin = ?", [origin])?;
            tx.execute("DELETE FROM refresh_cookies WHERE origin = ?", [origin])?;
            tx.execute("DELETE FROM session_markers WHERE origin = ?", [origin])?;
            Ok(())
        })
    }
}
