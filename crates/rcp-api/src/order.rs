//! Orders: the purchase request that precedes a contract.

use serde::{Deserialize, Serialize};

use crate::wire::{id_list, id_string};

wire_enum! {
    /// Lifecycle of an order on the provider side.
    OrderStatus {
        Pending => "PENDING",
        Accepted => "ACCEPTED",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "orderId", default, deserialize_with = "id_string")]
    pub order_id: String,
    #[serde(rename = "customerId", default, deserialize_with = "id_string")]
    pub customer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    /// Populated asynchronously once the order has been confirmed.
    #[serde(
        rename = "contractId",
        default,
        deserialize_with = "id_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub contract_id: String,
}

/// Result of `order.create`; also its wire payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedOrder {
    #[serde(rename = "orderId", default, deserialize_with = "id_string")]
    pub order_id: String,
}

/// Result of `order.confirm`; also its wire payload. The engine expects
/// exactly one contract id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedOrder {
    #[serde(rename = "contractID", default, deserialize_with = "id_list")]
    pub contract_ids: Vec<String>,
}

// Command payloads.

#[derive(Serialize)]
pub(crate) struct OrderGetParams<'a> {
    #[serde(rename = "orderId")]
    pub order_id: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct OrderGetPayload {
    #[serde(default)]
    pub order: Option<Order>,
}

#[derive(Serialize)]
pub(crate) struct OrderCreateParams<'a> {
    #[serde(rename = "productCode")]
    pub product_code: &'a str,
    #[serde(rename = "customerId")]
    pub customer_id: &'a str,
    #[serde(rename = "productDetails")]
    pub product_details: &'a crate::ProductDetails,
}

#[derive(Serialize)]
pub(crate) struct OrderConfirmParams<'a> {
    #[serde(rename = "orderId")]
    pub order_id: &'a str,
}
