//! Web API operations
//!
//! Every operation is a method on [`TicketDeskClient`](crate::TicketDeskClient)
//! and goes through its dispatcher, so each one gets the bearer credential
//! and transparent token refresh.

mod orders;
mod session;
mod ticket_products;
mod tickets;

use serde::de::DeserializeOwned;

use crate::TicketDeskClient;
use crate::dispatch::ApiRequest;
use crate::error::Error;
use crate::model::Listing;
use crate::model::Payload;

impl TicketDeskClient {
    /// Sends `request` and unwraps the `data` envelope.
    pub(crate) async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, Error> {
        let payload: Payload<T> = self.send(request).await?;
        Ok(payload.into_data())
    }

    /// Sends `request` and unwraps an enveloped, possibly paged list.
    pub(crate) async fn fetch_list<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<Vec<T>, Error> {
        let listing: Listing<T> = self.fetch(request).await?;
        Ok(listing.into_vec())
    }

    /// Sends `request` and discards whatever body comes back.
    pub(crate) async fn fire(&self, request: ApiRequest) -> Result<(), Error> {
        self.send_raw(&request).await?;
        Ok(())
    }
}
