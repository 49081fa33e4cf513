//! Canned provider objects and stores for scenarios.

use serde_json::json;

use rcp_api::{
    ConfirmedOrder, Contract, ContractStatus, CreatedOrder, Device, DeviceExtra, Order,
    OrderStatus, Transaction, TransactionObjectType, TransactionPage, TransactionStatus,
    SYS_POWERSTATUS, SYS_POWERSWITCH,
};
use rcp_engine::store::{self, AttributeStore};
use rcp_engine::MemoryStore;
use rcp_poll::WaitSettings;
use std::time::Duration;

pub const CUSTOMER_ID: &str = "456";

/// Store holding the smallest valid server specification.
pub fn server_store() -> MemoryStore {
    MemoryStore::with_attributes([
        (store::SERVER_CLASS, json!("PERFORMANCE")),
        (store::COUNTRY, json!("AU")),
        (store::CPU_COUNT, json!(1)),
        (store::OPERATING_SYSTEM, json!("UBUNTU14.04_64")),
    ])
}

/// Store for an already-provisioned server.
pub fn provisioned_store(order_id: &str, device_id: &str) -> MemoryStore {
    let mut s = server_store();
    s.id = Some(order_id.to_string());
    s.attributes
        .insert(store::DEVICE_ID.to_string(), json!(device_id));
    s
}

/// Short waits so timeouts are reachable in a handful of fake sleeps.
pub fn quick_waits() -> WaitSettings {
    WaitSettings {
        timeout: Duration::from_secs(60),
        delay: Duration::from_secs(10),
        min_interval: Duration::from_secs(3),
    }
}

pub fn created(order_id: &str) -> CreatedOrder {
    CreatedOrder {
        order_id: order_id.to_string(),
    }
}

pub fn confirmed(contract_ids: &[&str]) -> ConfirmedOrder {
    ConfirmedOrder {
        contract_ids: contract_ids.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn order(order_id: &str, contract_id: &str) -> Order {
    Order {
        order_id: order_id.to_string(),
        customer_id: CUSTOMER_ID.to_string(),
        status: Some(OrderStatus::Accepted),
        contract_id: contract_id.to_string(),
    }
}

pub fn contract(contract_id: &str, status: ContractStatus, device_id: &str) -> Contract {
    Contract {
        contract_id: contract_id.to_string(),
        customer_id: CUSTOMER_ID.to_string(),
        device_id: device_id.to_string(),
        status,
        contract_type: "SERVER".to_string(),
    }
}

pub fn contract_pending(contract_id: &str) -> Contract {
    contract(contract_id, ContractStatus::Pending, "")
}

pub fn contract_active(contract_id: &str, device_id: &str) -> Contract {
    contract(contract_id, ContractStatus::Active, device_id)
}

/// Device with the given power switch/status readings. `None` omits the key.
pub fn device(device_id: &str, switch: Option<&str>, status: Option<&str>) -> Device {
    let mut extra = Vec::new();
    if let Some(s) = switch {
        extra.push(DeviceExtra {
            key: SYS_POWERSWITCH.to_string(),
            value: json!(s),
        });
    }
    if let Some(s) = status {
        extra.push(DeviceExtra {
            key: SYS_POWERSTATUS.to_string(),
            value: json!(s),
        });
    }
    Device {
        device_id: device_id.to_string(),
        name: format!("server-{device_id}"),
        customer_id: CUSTOMER_ID.to_string(),
        primary_ip: "203.0.113.10".to_string(),
        status: "ACTIVE".to_string(),
        data_center_id: "3".to_string(),
        extra,
        firewall_policies: Vec::new(),
    }
}

pub fn device_online(device_id: &str) -> Device {
    device(device_id, Some("ONLINE"), Some("ONLINE"))
}

pub fn device_offline(device_id: &str) -> Device {
    device(device_id, Some("OFFLINE"), Some("OFFLINE"))
}

pub fn transaction(transaction_id: &str, device_id: &str, status: Option<TransactionStatus>) -> Transaction {
    Transaction {
        transaction_id: transaction_id.to_string(),
        object_type: TransactionObjectType::Device,
        object_id: device_id.to_string(),
        status,
        ..Transaction::default()
    }
}

pub fn empty_page() -> TransactionPage {
    TransactionPage::default()
}

pub fn busy_page(device_id: &str, outstanding: usize) -> TransactionPage {
    TransactionPage {
        transactions: (0..outstanding)
            .map(|n| transaction(&format!("9{n}"), device_id, Some(TransactionStatus::Pending)))
            .collect(),
        matched: outstanding as u64,
    }
}

/// Convenience for asserting computed string attributes.
pub fn attr(store: &MemoryStore, key: &str) -> Option<String> {
    store::get_str(store, key)
}

/// `true` when the store still carries a resource id.
pub fn has_id(store: &MemoryStore) -> bool {
    store.id().is_some()
}
