//! Order operations

use crate::TicketDeskClient;
use crate::dispatch::ApiRequest;
use crate::error::Error;
use crate::model::NewOrder;
use crate::model::Order;

const ORDERS: &str = "/v1/orders";

impl TicketDeskClient {
    /// Places an order.
    pub async fn create_order(&self, order: &NewOrder) -> Result<(), Error> {
        self.fire(ApiRequest::post(ORDERS).json(order)?).await
    }

    /// Lists all orders.
    pub async fn list_orders(&self) -> Result<Vec<Order>, Error> {
        self.fetch_list(ApiRequest::get(ORDERS)).await
    }

    /// Lists the orders placed by one account.
    pub async fn list_account_orders(&self, account_id: i64) -> Result<Vec<Order>, Error> {
        self.fetch_list(ApiRequest::get(ORDERS).query("accountId", account_id))
            .await
    }
}
