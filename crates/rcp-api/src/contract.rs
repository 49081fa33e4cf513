//! Contracts: the billing record that owns a device once provisioned.

use serde::{Deserialize, Serialize};

use crate::wire::{id_string, nullable_string};

wire_enum! {
    /// Contract lifecycle. `PENDING -> ACTIVE` never reverts.
    ContractStatus {
        Pending => "PENDING",
        Active => "ACTIVE",
        Cancelled => "CANCELLED",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    #[serde(rename = "contractId", default, deserialize_with = "id_string")]
    pub contract_id: String,
    #[serde(rename = "customerId", default, deserialize_with = "id_string")]
    pub customer_id: String,
    /// Empty until the underlying device has been provisioned.
    #[serde(
        rename = "deviceID",
        default,
        deserialize_with = "id_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub device_id: String,
    #[serde(default)]
    pub status: ContractStatus,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "nullable_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub contract_type: String,
}

#[derive(Serialize)]
pub(crate) struct ContractGetParams<'a> {
    #[serde(rename = "contractId")]
    pub contract_id: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct ContractGetPayload {
    #[serde(default)]
    pub contract: Option<Contract>,
}
