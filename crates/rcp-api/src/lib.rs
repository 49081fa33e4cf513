//! rcp-api
//!
//! Typed client for the Rackcorp provisioning API.
//!
//! # Design
//!
//! - [`RackcorpApi`] is the seam the provisioning engine depends on. The
//!   production implementation is [`RackcorpClient`]; tests script a fake.
//! - Status vocabularies are closed enums with an `Other` escape hatch so an
//!   unseen provider value decodes instead of failing the whole response.
//! - Wire field names live only in serde attributes; the Rust surface uses
//!   snake_case throughout.

#[macro_use]
mod wire;

mod client;
mod contract;
mod device;
mod error;
mod order;
mod product;
mod transaction;

pub use client::{RackcorpClient, DEFAULT_HTTP_TIMEOUT};
pub use contract::{Contract, ContractStatus};
pub use device::{
    Device, DeviceExtra, FirewallAction, FirewallDirection, FirewallPolicy, POWER_OFFLINE,
    POWER_ONLINE, SYS_POWERSTATUS, SYS_POWERSWITCH,
};
pub use error::{ApiError, BoxError, ClientError};
pub use order::{ConfirmedOrder, CreatedOrder, Order, OrderStatus};
pub use product::{product_code, Credential, Install, NicSpec, ProductDetails, StorageSpec};
pub use transaction::{
    Transaction, TransactionFilter, TransactionObjectType, TransactionPage, TransactionStatus,
    TransactionType,
};
pub use wire::{Envelope, CODE_OK};

/// Production endpoint. Every command is POSTed here.
pub const DEFAULT_ADDRESS: &str = "https://api.rackcorp.net/api/rest/v1/json.php";

/// One method per provider command.
///
/// Implementations must reject empty required identifiers with
/// [`ClientError::Validation`] before doing any I/O.
pub trait RackcorpApi: Send + Sync {
    fn device_get(&self, device_id: &str) -> Result<Device, ClientError>;

    /// Submit a firewall changeset. Entries with policy `DELETED` remove the
    /// matching rule; all others are added.
    fn device_update_firewall(
        &self,
        device_id: &str,
        policies: &[FirewallPolicy],
    ) -> Result<(), ClientError>;

    fn order_get(&self, order_id: &str) -> Result<Order, ClientError>;

    fn order_create(
        &self,
        product_code: &str,
        customer_id: &str,
        product_details: &ProductDetails,
    ) -> Result<CreatedOrder, ClientError>;

    /// Fails with an API error when the provider returns no contract id.
    fn order_confirm(&self, order_id: &str) -> Result<ConfirmedOrder, ClientError>;

    fn order_contract_get(&self, contract_id: &str) -> Result<Contract, ClientError>;

    fn transaction_create(
        &self,
        transaction_type: &TransactionType,
        object_type: &TransactionObjectType,
        object_id: &str,
        confirm: bool,
    ) -> Result<Transaction, ClientError>;

    fn transaction_get(&self, transaction_id: &str) -> Result<Transaction, ClientError>;

    fn transaction_get_all(&self, filter: &TransactionFilter)
        -> Result<TransactionPage, ClientError>;
}

impl<T: RackcorpApi + ?Sized> RackcorpApi for &T {
    fn device_get(&self, device_id: &str) -> Result<Device, ClientError> {
        (**self).device_get(device_id)
    }
    fn device_update_firewall(
        &self,
        device_id: &str,
        policies: &[FirewallPolicy],
    ) -> Result<(), ClientError> {
        (**self).device_update_firewall(device_id, policies)
    }
    fn order_get(&self, order_id: &str) -> Result<Order, ClientError> {
        (**self).order_get(order_id)
    }
    fn order_create(
        &self,
        product_code: &str,
        customer_id: &str,
        product_details: &ProductDetails,
    ) -> Result<CreatedOrder, ClientError> {
        (**self).order_create(product_code, customer_id, product_details)
    }
    fn order_confirm(&self, order_id: &str) -> Result<ConfirmedOrder, ClientError> {
        (**self).order_confirm(order_id)
    }
    fn order_contract_get(&self, contract_id: &str) -> Result<Contract, ClientError> {
        (**self).order_contract_get(contract_id)
    }
    fn transaction_create(
        &self,
        transaction_type: &TransactionType,
        object_type: &TransactionObjectType,
        object_id: &str,
        confirm: bool,
    ) -> Result<Transaction, ClientError> {
        (**self).transaction_create(transaction_type, object_type, object_id, confirm)
    }
    fn transaction_get(&self, transaction_id: &str) -> Result<Transaction, ClientError> {
        (**self).transaction_get(transaction_id)
    }
    fn transaction_get_all(
        &self,
        filter: &TransactionFilter,
    ) -> Result<TransactionPage, ClientError> {
        (**self).transaction_get_all(filter)
    }
}
