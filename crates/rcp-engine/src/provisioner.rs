//! Provisioning state machine.
//!
//! # Create
//!
//! ```text
//! Ordering ─► Confirming ─► AwaitingContract ─► DrainingTransactions ─► PoweringOn ─► Settled
//!  order.create  order.confirm   poll contract       poll getall (empty)     startup +
//!                (exactly one    PENDING -> ACTIVE                           poll power
//!                 contract id)                                               OFFLINE -> ONLINE
//! ```
//!
//! # Invariants
//!
//! 1. Stages run strictly in order; no stage starts before its predecessor's
//!    wait has observed the target state.
//! 2. The resource id (order id) is stored as soon as the order exists, and
//!    `contract_id` / `device_id` as soon as they are observed, so a failed
//!    Create can be reconciled by Read or cleaned up by Delete.
//! 3. Nothing is rolled back. Errors carry the stage they happened in.
//! 4. "Not found" is the only remote failure turned into a non-error
//!    (resource absent on Read, already gone on Delete).

use serde_json::Value;
use tracing::{debug, field, info, info_span, warn};
use uuid::Uuid;

use rcp_api::{
    ClientError, Contract, ContractStatus, Device, FirewallPolicy, RackcorpApi, Transaction,
    TransactionFilter, TransactionObjectType, TransactionStatus, TransactionType, POWER_OFFLINE,
    POWER_ONLINE,
};
use rcp_poll::{wait_for, Clock, PollError, PollSpec, WaitSettings};

use crate::error::EngineError;
use crate::firewall::{diff_policies, FirewallChangeset};
use crate::server::ServerSpec;
use crate::stage::Stage;
use crate::store::{self, get_str, set_str, AttributeStore};

// Drain-poll pseudo states.
const DRAIN_PENDING: &str = "PENDING";
const DRAIN_DONE: &str = "COMPLETED";

/// Result of [`Provisioner::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Attributes refreshed from the provider.
    Present,
    /// The resource no longer exists; the stored id has been cleared.
    Absent,
}

/// Drives Create/Read/Update/Delete for one virtual server at a time.
///
/// Dependencies are injected: the API implementation, the customer the
/// orders are placed for, wait timings and the clock used for polling.
pub struct Provisioner<A, C> {
    api: A,
    customer_id: String,
    waits: WaitSettings,
    clock: C,
}

impl<A: RackcorpApi, C: Clock> Provisioner<A, C> {
    pub fn new(api: A, customer_id: impl Into<String>, clock: C) -> Self {
        Self {
            api,
            customer_id: customer_id.into(),
            waits: WaitSettings::default(),
            clock,
        }
    }

    pub fn with_waits(mut self, waits: WaitSettings) -> Self {
        self.waits = waits;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    pub fn create<S: AttributeStore + ?Sized>(&self, store: &mut S) -> Result<(), EngineError> {
        let span = info_span!("create", op_id = %Uuid::new_v4(), resource_id = field::Empty);
        let _guard = span.enter();

        if self.customer_id.trim().is_empty() {
            return Err(EngineError::Validation("customer id must not be empty".to_string()));
        }
        let spec = ServerSpec::from_store(store)?;

        info!(stage = %Stage::Ordering, product = %spec.product_code(), "stage");
        let created = self
            .api
            .order_create(&spec.product_code(), &self.customer_id, &spec.product_details())
            .map_err(|e| EngineError::client(Stage::Ordering, "order.create", e))?;
        let order_id = created.order_id;
        span.record("resource_id", order_id.as_str());
        store.set_id(&order_id)?;

        info!(stage = %Stage::Confirming, %order_id, "stage");
        let confirmed = self.api.order_confirm(&order_id).map_err(|e| {
            EngineError::client(Stage::Confirming, format!("order.confirm order_id={order_id}"), e)
        })?;
        let contract_id = match confirmed.contract_ids.as_slice() {
            [one] => one.clone(),
            ids => {
                return Err(EngineError::ShapeViolation {
                    stage: Stage::Confirming,
                    detail: format!(
                        "order {order_id} confirmed into {} contracts, expected exactly 1",
                        ids.len()
                    ),
                })
            }
        };
        set_str(store, store::CONTRACT_ID, &contract_id)?;

        let contract = self.await_contract(store, &contract_id)?;
        let device_id = contract.device_id.clone();

        self.drain_transactions(&device_id)?;

        let device = self.power_on(&device_id)?;

        info!(stage = %Stage::Settled, %order_id, %device_id, "stage");
        write_device(store, &device_id, &device)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    /// Re-derive contract and device attributes from provider truth.
    ///
    /// Waits for a still-pending contract and for in-flight device
    /// transactions, but never orders or powers anything on.
    pub fn read<S: AttributeStore + ?Sized>(&self, store: &mut S) -> Result<ReadOutcome, EngineError> {
        let span = info_span!("read", op_id = %Uuid::new_v4(), resource_id = field::Empty);
        let _guard = span.enter();

        let Some(order_id) = store.id() else {
            debug!("no resource id stored");
            return Ok(ReadOutcome::Absent);
        };
        span.record("resource_id", order_id.as_str());
        info!(stage = %Stage::Reading, %order_id, "stage");

        let order = match self.api.order_get(&order_id) {
            Ok(order) => order,
            Err(e) if e.is_not_found() => return gone(store, "order not found"),
            Err(e) => {
                return Err(EngineError::client(
                    Stage::Reading,
                    format!("order.get order_id={order_id}"),
                    e,
                ))
            }
        };
        if order.contract_id.is_empty() {
            return gone(store, "order has no contract");
        }
        set_str(store, store::CONTRACT_ID, &order.contract_id)?;

        let contract = match self.await_contract(store, &order.contract_id) {
            Ok(c) => c,
            Err(e) if e.is_not_found() => return gone(store, "contract not found"),
            Err(EngineError::Poll {
                source: PollError::UnexpectedState { ref state, .. },
                ..
            }) if state == ContractStatus::Cancelled.as_str() => {
                set_str(store, store::CONTRACT_STATUS, state)?;
                return gone(store, "contract cancelled");
            }
            Err(e) => return Err(e),
        };

        self.drain_transactions(&contract.device_id)?;

        let device = match self.api.device_get(&contract.device_id) {
            Ok(d) => d,
            Err(e) if e.is_not_found() => return gone(store, "device not found"),
            Err(e) => {
                return Err(EngineError::client(
                    Stage::Reading,
                    format!("device.get device_id={}", contract.device_id),
                    e,
                ))
            }
        };
        write_device(store, &contract.device_id, &device)?;
        Ok(ReadOutcome::Present)
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    /// Move the device firewall from the stored policy set to `desired`.
    ///
    /// Only firewall policies are updatable. An empty changeset makes no
    /// remote call.
    pub fn update<S: AttributeStore + ?Sized>(
        &self,
        store: &mut S,
        desired: &[FirewallPolicy],
    ) -> Result<FirewallChangeset, EngineError> {
        let span = info_span!("update", op_id = %Uuid::new_v4(), resource_id = field::Empty);
        let _guard = span.enter();
        if let Some(id) = store.id() {
            span.record("resource_id", id.as_str());
        }

        let device_id = required_device_id(store)?;
        let current = stored_policies(store)?;
        let changeset = diff_policies(&current, desired);

        if changeset.is_empty() {
            debug!(%device_id, "firewall unchanged");
            return Ok(changeset);
        }

        info!(
            stage = %Stage::UpdatingFirewall,
            %device_id,
            added = changeset.added.len(),
            deleted = changeset.deleted.len(),
            "stage"
        );
        self.api
            .device_update_firewall(&device_id, &changeset.to_submission())
            .map_err(|e| {
                EngineError::client(
                    Stage::UpdatingFirewall,
                    format!("device.update.firewall device_id={device_id}"),
                    e,
                )
            })?;

        let device = self.api.device_get(&device_id).map_err(|e| {
            EngineError::client(Stage::UpdatingFirewall, format!("device.get device_id={device_id}"), e)
        })?;
        write_device(store, &device_id, &device)?;
        Ok(changeset)
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Cancel the device and wait for the cancellation to complete.
    pub fn delete<S: AttributeStore + ?Sized>(&self, store: &mut S) -> Result<(), EngineError> {
        let span = info_span!("delete", op_id = %Uuid::new_v4(), resource_id = field::Empty);
        let _guard = span.enter();
        if let Some(id) = store.id() {
            span.record("resource_id", id.as_str());
        }

        let device_id = required_device_id(store)?;
        info!(stage = %Stage::Cancelling, %device_id, "stage");

        let cancel = match self.api.transaction_create(
            &TransactionType::Cancel,
            &TransactionObjectType::Device,
            &device_id,
            true,
        ) {
            Ok(t) => t,
            Err(e) if e.is_not_found() => {
                warn!(%device_id, "device already gone");
                store.clear_id()?;
                return Ok(());
            }
            Err(e) => {
                return Err(EngineError::client(
                    Stage::Cancelling,
                    format!("rctransaction.create CANCEL device_id={device_id}"),
                    e,
                ))
            }
        };

        let spec = PollSpec::new(
            "cancel_transaction",
            [TransactionStatus::Pending.as_str(), TransactionStatus::Commenced.as_str()],
            TransactionStatus::Completed.as_str(),
        )
        .with_settings(self.waits);

        wait_for(&spec, &self.clock, || {
            let t = self.api.transaction_get(&cancel.transaction_id)?;
            let state = transaction_state(&t);
            Ok::<_, ClientError>((t, state))
        })
        .map_err(|source| EngineError::Poll {
            stage: Stage::Cancelling,
            source,
        })?;

        store.clear_id()?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Stages shared by Create and Read
    // -----------------------------------------------------------------------

    /// Poll the contract until `ACTIVE`. `device_id` is persisted as soon as
    /// the provider reports it, even if the wait then fails.
    fn await_contract<S: AttributeStore + ?Sized>(
        &self,
        store: &mut S,
        contract_id: &str,
    ) -> Result<Contract, EngineError> {
        info!(stage = %Stage::AwaitingContract, %contract_id, "stage");
        let spec = PollSpec::new(
            "contract_status",
            [ContractStatus::Pending.as_str()],
            ContractStatus::Active.as_str(),
        )
        .with_settings(self.waits);

        let mut seen_device: Option<String> = None;
        let result = wait_for(&spec, &self.clock, || {
            let c = self.api.order_contract_get(contract_id)?;
            if !c.device_id.is_empty() {
                seen_device = Some(c.device_id.clone());
            }
            let state = c.status.as_str().to_string();
            Ok::<_, ClientError>((c, state))
        });

        if let Some(device_id) = &seen_device {
            set_str(store, store::DEVICE_ID, device_id)?;
        }

        let contract = result.map_err(|source| EngineError::Poll {
            stage: Stage::AwaitingContract,
            source,
        })?;
        set_str(store, store::CONTRACT_STATUS, contract.status.as_str())?;

        if contract.device_id.is_empty() {
            return Err(EngineError::ShapeViolation {
                stage: Stage::AwaitingContract,
                detail: format!("contract {contract_id} is active but has no device id"),
            });
        }
        Ok(contract)
    }

    /// Wait until no `PENDING`/`COMMENCED` transactions remain on the device.
    fn drain_transactions(&self, device_id: &str) -> Result<(), EngineError> {
        info!(stage = %Stage::DrainingTransactions, %device_id, "stage");
        let spec = PollSpec::new("device_transactions", [DRAIN_PENDING], DRAIN_DONE)
            .with_settings(self.waits);
        let filter = TransactionFilter::outstanding_for_device(device_id);

        wait_for(&spec, &self.clock, || {
            let page = self.api.transaction_get_all(&filter)?;
            let state = if page.is_empty() { DRAIN_DONE } else { DRAIN_PENDING };
            if !page.is_empty() {
                debug!(%device_id, outstanding = page.matched, "device has outstanding transactions");
            }
            Ok::<_, ClientError>(((), state.to_string()))
        })
        .map_err(|source| EngineError::Poll {
            stage: Stage::DrainingTransactions,
            source,
        })
    }

    /// Issue STARTUP, then wait for the effective power status to be ONLINE.
    fn power_on(&self, device_id: &str) -> Result<Device, EngineError> {
        info!(stage = %Stage::PoweringOn, %device_id, "stage");
        let startup = self
            .api
            .transaction_create(
                &TransactionType::Startup,
                &TransactionObjectType::Device,
                device_id,
                false,
            )
            .map_err(|e| {
                EngineError::client(
                    Stage::PoweringOn,
                    format!("rctransaction.create STARTUP device_id={device_id}"),
                    e,
                )
            })?;
        debug!(transaction_id = %startup.transaction_id, "startup issued");

        // A missing power switch reading means the device is not reporting yet.
        let spec = PollSpec::new("device_status", [POWER_OFFLINE, ""], POWER_ONLINE)
            .with_settings(self.waits);

        wait_for(&spec, &self.clock, || {
            let d = self.api.device_get(device_id)?;
            let state = d.power_status();
            Ok::<_, ClientError>((d, state))
        })
        .map_err(|source| EngineError::Poll {
            stage: Stage::PoweringOn,
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn gone<S: AttributeStore + ?Sized>(store: &mut S, reason: &str) -> Result<ReadOutcome, EngineError> {
    warn!(reason, "resource absent");
    store.clear_id()?;
    Ok(ReadOutcome::Absent)
}

fn required_device_id<S: AttributeStore + ?Sized>(store: &S) -> Result<String, EngineError> {
    get_str(store, store::DEVICE_ID).ok_or_else(|| {
        EngineError::Validation(format!("{} attribute is required", store::DEVICE_ID))
    })
}

fn stored_policies<S: AttributeStore + ?Sized>(store: &S) -> Result<Vec<FirewallPolicy>, EngineError> {
    match store.get(store::FIREWALL_POLICIES) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(v) => serde_json::from_value(v).map_err(|e| {
            EngineError::Validation(format!("stored {} are invalid: {e}", store::FIREWALL_POLICIES))
        }),
    }
}

/// A transaction without a reported status has not been picked up yet.
fn transaction_state(t: &Transaction) -> String {
    t.status
        .as_ref()
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|| TransactionStatus::Pending.as_str().to_string())
}

/// Settled attributes observed on the device. `device_id` is the id the
/// engine looked the device up by; the payload's own id is not trusted.
fn write_device<S: AttributeStore + ?Sized>(
    store: &mut S,
    device_id: &str,
    device: &Device,
) -> Result<(), EngineError> {
    if device.device_id != device_id {
        warn!(%device_id, reported = %device.device_id, "device payload id differs from lookup id");
    }
    set_str(store, store::DEVICE_ID, device_id)?;
    set_str(store, store::NAME, &device.name)?;
    set_str(store, store::PRIMARY_IP, &device.primary_ip)?;
    set_str(store, store::DATA_CENTER_ID, &device.data_center_id)?;
    set_str(store, store::DEVICE_STATUS, &device.power_status())?;
    let policies = serde_json::to_value(&device.firewall_policies).map_err(|e| {
        EngineError::Store(crate::store::StoreError::new(store::FIREWALL_POLICIES, e.to_string()))
    })?;
    store.set(store::FIREWALL_POLICIES, policies)?;
    Ok(())
}
