//! Typed view of the virtual-server attributes.

use serde::Deserialize;
use serde_json::{Map, Value};

use rcp_api::{
    product_code, Credential, FirewallPolicy, Install, NicSpec, ProductDetails, StorageSpec,
};

use crate::error::EngineError;
use crate::store::{self, AttributeStore};

/// Keys read by [`ServerSpec::from_store`].
const INPUT_KEYS: [&str; 10] = [
    store::COUNTRY,
    store::SERVER_CLASS,
    store::OPERATING_SYSTEM,
    store::HOSTNAME,
    store::CPU_COUNT,
    store::MEMORY_GB,
    store::STORAGE,
    store::NICS,
    store::FIREWALL_POLICIES,
    store::CREDENTIALS,
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageAttr {
    pub size_gb: u32,
    #[serde(default, rename = "type")]
    pub storage_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NicAttr {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub vlan: Option<u32>,
    #[serde(default)]
    pub speed: Option<u32>,
}

/// Everything needed to place an order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSpec {
    pub country: String,
    pub server_class: String,
    pub operating_system: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub cpu_count: Option<u32>,
    #[serde(default)]
    pub memory_gb: Option<u32>,
    #[serde(default)]
    pub storage: Vec<StorageAttr>,
    #[serde(default)]
    pub nics: Vec<NicAttr>,
    #[serde(default)]
    pub firewall_policies: Vec<FirewallPolicy>,
    #[serde(default)]
    pub credentials: Vec<Credential>,
}

impl ServerSpec {
    pub fn from_store<S: AttributeStore + ?Sized>(store: &S) -> Result<Self, EngineError> {
        let mut map = Map::new();
        for key in INPUT_KEYS {
            match store.get(key) {
                None | Some(Value::Null) => {}
                Some(v) => {
                    map.insert(key.to_string(), v);
                }
            }
        }

        let spec: ServerSpec = serde_json::from_value(Value::Object(map))
            .map_err(|e| EngineError::Validation(format!("invalid server attributes: {e}")))?;

        for (key, value) in [
            (store::COUNTRY, &spec.country),
            (store::SERVER_CLASS, &spec.server_class),
            (store::OPERATING_SYSTEM, &spec.operating_system),
        ] {
            if value.trim().is_empty() {
                return Err(EngineError::Validation(format!("{key} must not be empty")));
            }
        }
        Ok(spec)
    }

    /// `SERVER_VIRTUAL_<class>_<country>`.
    pub fn product_code(&self) -> String {
        product_code(&self.server_class, &self.country)
    }

    pub fn product_details(&self) -> ProductDetails {
        ProductDetails {
            hostname: self.hostname.clone(),
            install: Install {
                operating_system: self.operating_system.clone(),
            },
            cpu: self.cpu_count,
            memory_gb: self.memory_gb,
            storage: self
                .storage
                .iter()
                .map(|s| StorageSpec {
                    size_gb: s.size_gb,
                    storage_type: s.storage_type.clone(),
                })
                .collect(),
            nics: self
                .nics
                .iter()
                .map(|n| NicSpec {
                    name: n.name.clone(),
                    vlan: n.vlan,
                    speed: n.speed,
                })
                .collect(),
            firewall_policies: self.firewall_policies.clone(),
            credentials: self.credentials.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn base() -> MemoryStore {
        MemoryStore::with_attributes([
            (store::COUNTRY, json!("AU")),
            (store::SERVER_CLASS, json!("PERFORMANCE")),
            (store::OPERATING_SYSTEM, json!("UBUNTU14.04_64")),
        ])
    }

    #[test]
    fn minimal_spec_builds_product() {
        let mut s = base();
        s.set(store::CPU_COUNT, json!(1)).unwrap();
        let spec = ServerSpec::from_store(&s).unwrap();
        assert_eq!(spec.product_code(), "SERVER_VIRTUAL_PERFORMANCE_AU");

        let details = spec.product_details();
        assert_eq!(details.cpu, Some(1));
        assert_eq!(details.install.operating_system, "UBUNTU14.04_64");
        assert!(details.storage.is_empty());
    }

    #[test]
    fn computed_attributes_are_ignored() {
        let mut s = base();
        s.set(store::DEVICE_ID, json!("678")).unwrap();
        s.set(store::HOSTNAME, json!(null)).unwrap();
        assert!(ServerSpec::from_store(&s).is_ok());
    }

    #[test]
    fn missing_required_is_validation_error() {
        let s = MemoryStore::with_attributes([(store::COUNTRY, json!("AU"))]);
        let err = ServerSpec::from_store(&s).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(err.to_string().contains("server_class"), "{err}");
    }

    #[test]
    fn blank_required_is_validation_error() {
        let mut s = base();
        s.set(store::COUNTRY, json!("  ")).unwrap();
        let err = ServerSpec::from_store(&s).unwrap_err();
        assert!(err.to_string().contains("country must not be empty"), "{err}");
    }

    #[test]
    fn nested_lists_map_to_product_details() {
        let mut s = base();
        s.set(store::STORAGE, json!([{"size_gb": 40, "type": "SSD"}])).unwrap();
        s.set(store::NICS, json!([{"name": "eth0", "vlan": 100}])).unwrap();
        s.set(
            store::FIREWALL_POLICIES,
            json!([{"direction": "INBOUND", "policy": "ALLOW", "portTo": "22", "order": 1}]),
        )
        .unwrap();
        s.set(store::CREDENTIALS, json!([{"username": "root", "password": "pw"}]))
            .unwrap();

        let details = ServerSpec::from_store(&s).unwrap().product_details();
        assert_eq!(details.storage[0].size_gb, 40);
        assert_eq!(details.storage[0].storage_type.as_deref(), Some("SSD"));
        assert_eq!(details.nics[0].vlan, Some(100));
        assert_eq!(details.firewall_policies.len(), 1);
        assert_eq!(details.credentials[0].username, "root");
    }

    #[test]
    fn unknown_storage_field_rejected() {
        let mut s = base();
        s.set(store::STORAGE, json!([{"size": 40}])).unwrap();
        assert!(matches!(
            ServerSpec::from_store(&s),
            Err(EngineError::Validation(_))
        ));
    }
}
