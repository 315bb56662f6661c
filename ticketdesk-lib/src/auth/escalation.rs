//! Session teardown after an unrecoverable refresh failure.

use std::sync::Arc;

use log::error;
use log::warn;

use super::TokenStore;
use crate::error::RefreshError;

/// Sends the user back to the login entry point.
///
/// Called once per failed refresh, after the session's credentials have been
/// deleted. Implementations decide what "login entry point" means for their
/// front end: a full navigation, a prompt, or exiting the session.
pub trait LoginRedirect: Send + Sync {
    /// Redirects to login. `cause` is the error that ended the session.
    fn redirect_to_login(&self, cause: &RefreshError);
}

/// A redirect that only logs; the caller sees the error and handles it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRedirect;

impl LoginRedirect for LogRedirect {
    fn redirect_to_login(&self, cause: &RefreshError) {
        warn!("session ended, login required: {}", cause);
    }
}

/// Deletes every stored credential and runs the login redirect.
#[derive(Clone)]
pub(crate) struct FailureEscalation {
    store: Arc<dyn TokenStore>,
    redirect: Arc<dyn LoginRedirect>,
}

impl FailureEscalation {
    pub fn new(store: Arc<dyn TokenStore>, redirect: Arc<dyn LoginRedirect>) -> Self {
        Self { store, redirect }
    }

    /// Tears the session down. Terminal: nothing retries after this.
    pub fn escalate(&self, cause: &RefreshError) {
        warn!("token refresh failed, tearing down session: {}", cause);

        if let Err(e) = self.store.clear() {
            // The redirect still runs; the user has to log in either way.
            error!("failed to clear stored credentials: {}", e);
        }

        self.redirect.redirect_to_login(cause);
    }
}
