//! Ticket product operations
//!
//! Products are soft-deleted, and their credential sheets are uploaded as
//! multipart files under the `file` field.

use bytes::Bytes;

use crate::TicketDeskClient;
use crate::dispatch::ApiRequest;
use crate::dispatch::FilePart;
use crate::error::Error;
use crate::model::TicketProduct;
use crate::model::TicketProductDraft;
use crate::model::TicketProductInfo;

const PRODUCTS: &str = "/v1/ticket-products";
const INFOS: &str = "/v1/ticket-products/infos";

/// Multipart field the upload endpoints read.
const UPLOAD_FIELD: &str = "file";

impl TicketDeskClient {
    /// Lists active ticket products.
    pub async fn list_ticket_products(&self) -> Result<Vec<TicketProduct>, Error> {
        self.fetch_list(ApiRequest::get(PRODUCTS).query("status", 1))
            .await
    }

    /// Lists the products of one ticket.
    pub async fn list_ticket_products_for(&self, ticket_id: i64) -> Result<Vec<TicketProduct>, Error> {
        self.fetch_list(ApiRequest::get(format!("{}/ticket", PRODUCTS)).query("ticketId", ticket_id))
            .await
    }

    /// Creates a ticket product.
    pub async fn create_ticket_product(&self, draft: &TicketProductDraft) -> Result<(), Error> {
        self.fire(ApiRequest::post(PRODUCTS).json(draft)?).await
    }

    /// Updates a ticket product. The draft must carry the product's id.
    pub async fn update_ticket_product(&self, draft: &TicketProductDraft) -> Result<(), Error> {
        self.fire(ApiRequest::put(PRODUCTS).json(draft)?).await
    }

    /// Soft-deletes a ticket product.
    pub async fn delete_ticket_product(&self, id: i64) -> Result<(), Error> {
        self.fire(ApiRequest::patch(format!("{}/soft-delete/{}", PRODUCTS, id)))
            .await
    }

    /// Uploads a file for a ticket product.
    pub async fn upload_ticket_product(
        &self,
        id: i64,
        file_name: &str,
        contents: impl Into<Bytes>,
    ) -> Result<(), Error> {
        let part = FilePart::new(UPLOAD_FIELD, file_name, contents);
        self.fire(ApiRequest::post(format!("{}/upload/{}", PRODUCTS, id)).file(part))
            .await
    }

    /// Uploads a sheet of credentials to sell through a ticket product.
    pub async fn upload_ticket_product_infos(
        &self,
        id: i64,
        file_name: &str,
        contents: impl Into<Bytes>,
    ) -> Result<(), Error> {
        let part = FilePart::new(UPLOAD_FIELD, file_name, contents);
        self.fire(ApiRequest::post(format!("{}/upload/{}", INFOS, id)).file(part))
            .await
    }

    /// Lists the credentials uploaded for a ticket product.
    pub async fn list_ticket_product_infos(
        &self,
        ticket_product_id: i64,
    ) -> Result<Vec<TicketProductInfo>, Error> {
        self.fetch_list(ApiRequest::get(INFOS).query("ticketProductId", ticket_product_id))
            .await
    }

    /// Edits one uploaded credential.
    pub async fn update_ticket_product_info(&self, info: &TicketProductInfo) -> Result<(), Error> {
        self.fire(ApiRequest::put(INFOS).json(info)?).await
    }
}
