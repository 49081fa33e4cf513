//! Blocking HTTP transport for the Rackcorp JSON API.
//!
//! One method per provider command. Each call validates its required
//! parameters, signs the request with the account credentials, POSTs it to
//! the single JSON endpoint and decodes `{code, message, debug, ...}`.
//!
//! # Invariants
//!
//! - Validation failures never touch the network.
//! - `code != "OK"` is an API error regardless of the HTTP status.
//! - An OK envelope without the expected payload is an API error too.
//! - No retries here; waiting on slow provider state is the poller's job.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::contract::{ContractGetParams, ContractGetPayload};
use crate::device::{DeviceGetParams, DeviceGetPayload, EmptyPayload, FirewallUpdateParams};
use crate::error::{ApiError, ClientError};
use crate::order::{OrderConfirmParams, OrderCreateParams, OrderGetParams, OrderGetPayload};
use crate::transaction::{
    TransactionCreateParams, TransactionGetAllPayload,
    TransactionGetParams, TransactionPayload,
};
use crate::wire::{Envelope, Request};
use crate::{
    ConfirmedOrder, Contract, CreatedOrder, Device, FirewallPolicy, Order, ProductDetails,
    RackcorpApi, Transaction, TransactionFilter, TransactionObjectType, TransactionPage,
    TransactionType, DEFAULT_ADDRESS,
};

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// Provider command names.
const CMD_DEVICE_GET: &str = "device.get";
const CMD_DEVICE_UPDATE_FIREWALL: &str = "device.update.firewall";
const CMD_ORDER_GET: &str = "order.get";
const CMD_ORDER_CREATE: &str = "order.create";
const CMD_ORDER_CONFIRM: &str = "order.confirm";
const CMD_CONTRACT_GET: &str = "order.contract.get";
const CMD_TRANSACTION_CREATE: &str = "rctransaction.create";
const CMD_TRANSACTION_GET: &str = "rctransaction.get";
const CMD_TRANSACTION_GET_ALL: &str = "rctransaction.getall";

/// Rackcorp API client. Immutable after construction; safe to share.
///
/// API secret is never logged; `Debug` redacts it.
#[derive(Clone)]
pub struct RackcorpClient {
    address: String,
    api_uuid: String,
    api_secret: String,
    timeout: Duration,
    http: reqwest::blocking::Client,
}

impl fmt::Debug for RackcorpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RackcorpClient")
            .field("address", &self.address)
            .field("api_uuid", &self.api_uuid)
            .field("api_secret", &"<REDACTED>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RackcorpClient {
    pub fn new(api_uuid: impl Into<String>, api_secret: impl Into<String>) -> Result<Self, ClientError> {
        let api_uuid = api_uuid.into();
        let api_secret = api_secret.into();
        if api_uuid.trim().is_empty() {
            return Err(ClientError::required("uuid"));
        }
        if api_secret.trim().is_empty() {
            return Err(ClientError::required("secret"));
        }

        Ok(Self {
            address: DEFAULT_ADDRESS.to_string(),
            api_uuid,
            api_secret,
            timeout: DEFAULT_HTTP_TIMEOUT,
            http: build_http(DEFAULT_HTTP_TIMEOUT)?,
        })
    }

    /// Point the client at another endpoint (test servers, staging).
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ClientError> {
        self.http = build_http(timeout)?;
        self.timeout = timeout;
        Ok(self)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Sign, send and decode one command.
    fn call<P, T>(&self, cmd: &'static str, params: P) -> Result<T, ClientError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let request = Request {
            api_uuid: &self.api_uuid,
            api_secret: &self.api_secret,
            cmd,
            params,
        };
        let body = serde_json::to_vec(&request).map_err(|e| ClientError::Codec {
            command: cmd,
            detail: format!("request encode failed: {e}"),
        })?;

        debug!(cmd, address = %self.address, "rackcorp request");

        let resp = self
            .http
            .post(&self.address)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| ClientError::transport(cmd, e))?;

        let status = resp.status();
        let text = resp.text().map_err(|e| ClientError::transport(cmd, e))?;

        let value: Value = serde_json::from_str(&text).map_err(|e| ClientError::Codec {
            command: cmd,
            detail: format!("response decode failed (http status {}): {e}", status.as_u16()),
        })?;

        let envelope = Envelope::deserialize(&value).map_err(|e| ClientError::Codec {
            command: cmd,
            detail: format!("response envelope decode failed: {e}"),
        })?;

        debug!(cmd, http_status = status.as_u16(), code = %envelope.code, "rackcorp response");

        if !envelope.is_ok() {
            return Err(ClientError::api(cmd, ApiError::from_envelope(&envelope)));
        }

        // Payload fields sit beside the envelope; the envelope keys are ignored.
        serde_json::from_value(value).map_err(|e| ClientError::Codec {
            command: cmd,
            detail: format!("response payload decode failed: {e}"),
        })
    }
}

fn build_http(timeout: Duration) -> Result<reqwest::blocking::Client, ClientError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ClientError::transport("client.build", e))
}

fn require(parameter: &str, value: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        Err(ClientError::required(parameter))
    } else {
        Ok(())
    }
}

/// OK envelope that lacks the field the command promises.
fn missing_payload(cmd: &'static str, field: &str) -> ClientError {
    ClientError::api(
        cmd,
        ApiError::new("OK", format!("response is missing `{field}`")),
    )
}

impl RackcorpApi for RackcorpClient {
    fn device_get(&self, device_id: &str) -> Result<Device, ClientError> {
        require("deviceId", device_id)?;
        let payload: DeviceGetPayload = self.call(CMD_DEVICE_GET, DeviceGetParams { device_id })?;
        payload
            .device
            .ok_or_else(|| missing_payload(CMD_DEVICE_GET, "device"))
    }

    fn device_update_firewall(
        &self,
        device_id: &str,
        policies: &[FirewallPolicy],
    ) -> Result<(), ClientError> {
        require("deviceId", device_id)?;
        let _: EmptyPayload = self.call(
            CMD_DEVICE_UPDATE_FIREWALL,
            FirewallUpdateParams {
                device_id,
                firewall_policies: policies,
            },
        )?;
        Ok(())
    }

    fn order_get(&self, order_id: &str) -> Result<Order, ClientError> {
        require("orderId", order_id)?;
        let payload: OrderGetPayload = self.call(CMD_ORDER_GET, OrderGetParams { order_id })?;
        payload
            .order
            .ok_or_else(|| missing_payload(CMD_ORDER_GET, "order"))
    }

    fn order_create(
        &self,
        product_code: &str,
        customer_id: &str,
        product_details: &ProductDetails,
    ) -> Result<CreatedOrder, ClientError> {
        require("productCode", product_code)?;
        require("customerId", customer_id)?;
        let created: CreatedOrder = self.call(
            CMD_ORDER_CREATE,
            OrderCreateParams {
                product_code,
                customer_id,
                product_details,
            },
        )?;
        if created.order_id.is_empty() {
            return Err(missing_payload(CMD_ORDER_CREATE, "orderId"));
        }
        Ok(created)
    }

    fn order_confirm(&self, order_id: &str) -> Result<ConfirmedOrder, ClientError> {
        require("orderId", order_id)?;
        let confirmed: ConfirmedOrder =
            self.call(CMD_ORDER_CONFIRM, OrderConfirmParams { order_id })?;
        if confirmed.contract_ids.is_empty() {
            return Err(missing_payload(CMD_ORDER_CONFIRM, "contractID"));
        }
        Ok(confirmed)
    }

    fn order_contract_get(&self, contract_id: &str) -> Result<Contract, ClientError> {
        require("contractId", contract_id)?;
        let payload: ContractGetPayload =
            self.call(CMD_CONTRACT_GET, ContractGetParams { contract_id })?;
        payload
            .contract
            .ok_or_else(|| missing_payload(CMD_CONTRACT_GET, "contract"))
    }

    fn transaction_create(
        &self,
        transaction_type: &TransactionType,
        object_type: &TransactionObjectType,
        object_id: &str,
        confirm: bool,
    ) -> Result<Transaction, ClientError> {
        require("transactionType", transaction_type.as_str())?;
        require("objectType", object_type.as_str())?;
        require("objectId", object_id)?;
        let payload: TransactionPayload = self.call(
            CMD_TRANSACTION_CREATE,
            TransactionCreateParams {
                object_type: object_type.as_str(),
                object_id,
                transaction_type: transaction_type.as_str(),
                confirm,
            },
        )?;
        payload
            .transaction
            .ok_or_else(|| missing_payload(CMD_TRANSACTION_CREATE, "rcTransaction"))
    }

    fn transaction_get(&self, transaction_id: &str) -> Result<Transaction, ClientError> {
        require("transactionId", transaction_id)?;
        let transaction_id: u64 = transaction_id.trim().parse().map_err(|_| {
            ClientError::Validation(format!(
                "transactionId must be an unsigned integer, got {transaction_id:?}"
            ))
        })?;
        let payload: TransactionPayload =
            self.call(CMD_TRANSACTION_GET, TransactionGetParams { transaction_id })?;
        payload
            .transaction
            .ok_or_else(|| missing_payload(CMD_TRANSACTION_GET, "rcTransaction"))
    }

    fn transaction_get_all(
        &self,
        filter: &TransactionFilter,
    ) -> Result<TransactionPage, ClientError> {
        let payload: TransactionGetAllPayload =
            self.call(CMD_TRANSACTION_GET_ALL, filter)?;
        let transactions = payload
            .transactions
            .ok_or_else(|| missing_payload(CMD_TRANSACTION_GET_ALL, "rcTransactions"))?;
        Ok(TransactionPage {
            transactions,
            matched: payload.matched,
        })
    }
}
