//! Ticket operations

use crate::TicketDeskClient;
use crate::dispatch::ApiRequest;
use crate::error::Error;
use crate::model::Ticket;
use crate::model::TicketDraft;

const TICKETS: &str = "/v1/tickets";

impl TicketDeskClient {
    /// Lists active tickets.
    pub async fn list_tickets(&self) -> Result<Vec<Ticket>, Error> {
        self.fetch_list(ApiRequest::get(TICKETS).query("status", 1)).await
    }

    /// Fetches a single ticket.
    pub async fn get_ticket(&self, id: i64) -> Result<Ticket, Error> {
        self.fetch(ApiRequest::get(format!("{}/{}", TICKETS, id))).await
    }

    /// Creates a ticket.
    pub async fn create_ticket(&self, draft: &TicketDraft) -> Result<(), Error> {
        self.fire(ApiRequest::post(TICKETS).json(draft)?).await
    }

    /// Updates a ticket. The draft must carry the ticket's id.
    pub async fn update_ticket(&self, draft: &TicketDraft) -> Result<(), Error> {
        self.fire(ApiRequest::put(TICKETS).json(draft)?).await
    }

    /// Deletes a ticket.
    pub async fn delete_ticket(&self, id: i64) -> Result<(), Error> {
        self.fire(ApiRequest::delete(format!("{}/{}", TICKETS, id))).await
    }
}
