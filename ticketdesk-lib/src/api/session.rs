//! Login and logout

use log::info;

use crate::TicketDeskClient;
use crate::error::AuthError;
use crate::error::Error;

impl TicketDeskClient {
    /// Logs in and stores the session's credential pair and role.
    ///
    /// The login call never carries a bearer credential and a 401 from it is
    /// returned as [`AuthError::LoginRejected`](crate::error::AuthError::LoginRejected)
    /// without any refresh attempt.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), Error> {
        let tokens = self.exchange().login(username, password).await?;
        let role = tokens.role.clone();
        let pair = tokens.into_pair(None);

        let store = self.token_store();
        store
            .begin_session(&pair, role.as_deref())
            .map_err(AuthError::from)?;

        info!(
            "logged in as {} (refreshable: {})",
            username,
            pair.can_refresh()
        );
        Ok(())
    }

    /// Deletes every stored credential.
    pub async fn logout(&self) -> Result<(), Error> {
        self.token_store().clear()?;
        info!("logged out");
        Ok(())
    }

    /// Returns `true` if an access token is stored.
    pub fn is_logged_in(&self) -> bool {
        self.token_store().access_token().is_some()
    }

    /// Returns the role marker stored at login.
    pub fn role(&self) -> Option<String> {
        self.token_store().role()
    }
}
