//! Transactions: asynchronous actions (startup, cancel, ...) on a device.

use serde::{Deserialize, Serialize};

use crate::wire::{id_string, nullable_string};

wire_enum! {
    TransactionStatus {
        Pending => "PENDING",
        Commenced => "COMMENCED",
        Completed => "COMPLETED",
    }
}

wire_enum! {
    TransactionType {
        Cancel => "CANCEL",
        CloseVnc => "CLOSEVNC",
        ForceShutdown => "FORCESHUTDOWN",
        /// `data` carries the public IP allowed to connect.
        OpenVnc => "OPENVNC",
        RefreshConfig => "REFRESHCONFIG",
        SafeShutdown => "SAFESHUTDOWN",
        Shutdown => "SHUTDOWN",
        Startup => "STARTUP",
    }
}

wire_enum! {
    TransactionObjectType {
        Device => "DEVICE",
    }
}

/// A transaction as returned by `rctransaction.create`, `.get` and `.getall`.
/// Create omits `status`; get omits the confirmation fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "rcTransactionId", default, deserialize_with = "id_string")]
    pub transaction_id: String,
    #[serde(rename = "objType", default)]
    pub object_type: TransactionObjectType,
    #[serde(rename = "objId", default, deserialize_with = "id_string")]
    pub object_id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,
    #[serde(rename = "confirmationRequired", default)]
    pub confirmation_required: bool,
    #[serde(
        rename = "confirmationText",
        default,
        deserialize_with = "nullable_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub confirmation_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TransactionStatus>,
    #[serde(
        rename = "statusInfo",
        default,
        deserialize_with = "nullable_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub status_info: String,
    #[serde(
        default,
        deserialize_with = "nullable_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub method: String,
    #[serde(
        default,
        deserialize_with = "nullable_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub data: String,
}

/// Query predicate for `rctransaction.getall`. Empty lists and `None`
/// fields are left off the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    #[serde(rename = "objType", default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<TransactionObjectType>,
    #[serde(rename = "objId", default, skip_serializing_if = "Vec::is_empty")]
    pub object_ids: Vec<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TransactionType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<TransactionStatus>,
    #[serde(rename = "customerId", default, skip_serializing_if = "Vec::is_empty")]
    pub customer_ids: Vec<String>,
    #[serde(rename = "resultStart", default, skip_serializing_if = "Option::is_none")]
    pub result_start: Option<u32>,
    #[serde(rename = "resultWindow", default, skip_serializing_if = "Option::is_none")]
    pub result_window: Option<u32>,
}

impl TransactionFilter {
    /// Outstanding (`PENDING` or `COMMENCED`) transactions for one device.
    pub fn outstanding_for_device(device_id: impl Into<String>) -> Self {
        Self {
            object_type: Some(TransactionObjectType::Device),
            object_ids: vec![device_id.into()],
            status: vec![TransactionStatus::Pending, TransactionStatus::Commenced],
            ..Self::default()
        }
    }
}

/// One page of `rctransaction.getall` results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPage {
    #[serde(rename = "rcTransactions", default)]
    pub transactions: Vec<Transaction>,
    /// Total matches server-side, which may exceed `transactions.len()`.
    #[serde(rename = "matchedTransactions", default)]
    pub matched: u64,
}

impl TransactionPage {
    pub fn is_empty(&self) -> bool {
        self.matched == 0 && self.transactions.is_empty()
    }
}

#[derive(Serialize)]
pub(crate) struct TransactionCreateParams<'a> {
    #[serde(rename = "objType")]
    pub object_type: &'a str,
    #[serde(rename = "objId")]
    pub object_id: &'a str,
    #[serde(rename = "type")]
    pub transaction_type: &'a str,
    #[serde(rename = "confirmation")]
    pub confirm: bool,
}

#[derive(Serialize)]
pub(crate) struct TransactionGetParams {
    #[serde(rename = "rcTransactionId")]
    pub transaction_id: u64,
}

/// `rcTransactions` must be present, even if empty.
#[derive(Deserialize)]
pub(crate) struct TransactionGetAllPayload {
    #[serde(rename = "rcTransactions", default)]
    pub transactions: Option<Vec<Transaction>>,
    #[serde(rename = "matchedTransactions", default)]
    pub matched: u64,
}

#[derive(Deserialize)]
pub(crate) struct TransactionPayload {
    #[serde(rename = "rcTransaction", default)]
    pub transaction: Option<Transaction>,
}
