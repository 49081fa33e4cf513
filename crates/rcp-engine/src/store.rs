//! Attribute store boundary.
//!
//! The caller owns all durable state. The engine only needs a resource id
//! slot plus a flat key/value bag of JSON values; [`AttributeStore`] is that
//! narrow capability.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// Attribute keys: inputs.
pub const COUNTRY: &str = "country";
pub const SERVER_CLASS: &str = "server_class";
pub const OPERATING_SYSTEM: &str = "operating_system";
pub const HOSTNAME: &str = "hostname";
pub const CPU_COUNT: &str = "cpu_count";
pub const MEMORY_GB: &str = "memory_gb";
pub const STORAGE: &str = "storage";
pub const NICS: &str = "nics";
pub const CREDENTIALS: &str = "credentials";
/// Input on create, refreshed from the device afterwards.
pub const FIREWALL_POLICIES: &str = "firewall_policies";

// Attribute keys: computed.
pub const CONTRACT_ID: &str = "contract_id";
pub const CONTRACT_STATUS: &str = "contract_status";
pub const DEVICE_ID: &str = "device_id";
pub const DEVICE_STATUS: &str = "device_status";
pub const NAME: &str = "name";
pub const PRIMARY_IP: &str = "primary_ip";
pub const DATA_CENTER_ID: &str = "data_center_id";

/// A write to the caller's store failed.
#[derive(Debug)]
pub struct StoreError {
    pub key: String,
    pub reason: String,
}

impl StoreError {
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attribute store write of {} failed: {}", self.key, self.reason)
    }
}

impl std::error::Error for StoreError {}

pub trait AttributeStore {
    /// Resource id (the order id), if one has been assigned.
    fn id(&self) -> Option<String>;

    fn set_id(&mut self, id: &str) -> Result<(), StoreError>;

    /// Mark the resource as gone.
    fn clear_id(&mut self) -> Result<(), StoreError>;

    fn get(&self, key: &str) -> Option<Value>;

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// Non-empty string attribute, trimmed.
pub fn get_str<S: AttributeStore + ?Sized>(store: &S, key: &str) -> Option<String> {
    match store.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn set_str<S: AttributeStore + ?Sized>(
    store: &mut S,
    key: &str,
    value: &str,
) -> Result<(), StoreError> {
    store.set(key, Value::String(value.to_string()))
}

/// In-memory store. Also the serialized shape of a state file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attributes<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            id: None,
            attributes: attributes.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl AttributeStore for MemoryStore {
    fn id(&self) -> Option<String> {
        self.id.clone().filter(|id| !id.is_empty())
    }

    fn set_id(&mut self, id: &str) -> Result<(), StoreError> {
        self.id = Some(id.to_string());
        Ok(())
    }

    fn clear_id(&mut self) -> Result<(), StoreError> {
        self.id = None;
        Ok(())
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.attributes.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.attributes.insert(key.to_string(), value);
        Ok(())
    }
}
