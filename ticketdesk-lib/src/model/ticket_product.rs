use rust_decimal::Decimal;
use serde::Deserialize;
use serde::Serialize;

use super::Ticket;

/// A purchasable product under a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketProduct {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: i64,
    /// Price in coins.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub ticket: Option<Ticket>,
    #[serde(default)]
    pub ticket_id: Option<i64>,
    #[serde(default)]
    pub max_purchase_per_account: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
}

impl TicketProduct {
    /// The owning ticket's id, from the nested ticket or the flat field.
    pub fn owning_ticket(&self) -> Option<i64> {
        self.ticket.as_ref().map(|t| t.id).or(self.ticket_id)
    }
}

/// Body for creating or updating a ticket product.
///
/// Leave `id` empty to create.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketProductDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub quantity: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub ticket_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_purchase_per_account: Option<i64>,
}

/// One delivered account credential sold through a ticket product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketProductInfo {
    pub id: i64,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub pass: Option<String>,
    #[serde(default, rename = "twoFA")]
    pub two_fa: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub pass_mail: Option<String>,
    #[serde(default)]
    pub mail_verify: Option<String>,
    #[serde(default)]
    pub is_sold: bool,
}
