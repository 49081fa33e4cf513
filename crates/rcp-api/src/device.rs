//! Devices: the concrete virtual server, its power state and firewall.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::wire::{id_string, nullable_string, opt_id_string};

/// `extra` key reporting whether the power switch is on.
pub const SYS_POWERSWITCH: &str = "SYS_POWERSWITCH";
/// `extra` key reporting the guest power state. Only meaningful when
/// [`SYS_POWERSWITCH`] is `ONLINE`.
pub const SYS_POWERSTATUS: &str = "SYS_POWERSTATUS";

/// Power value reported by both switch and status once the device is up.
pub const POWER_ONLINE: &str = "ONLINE";
pub const POWER_OFFLINE: &str = "OFFLINE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceExtra {
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(rename = "id", default, deserialize_with = "id_string")]
    pub device_id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(rename = "customerId", default, deserialize_with = "id_string")]
    pub customer_id: String,
    #[serde(
        rename = "primaryIP",
        default,
        deserialize_with = "nullable_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub primary_ip: String,
    #[serde(
        default,
        deserialize_with = "nullable_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub status: String,
    #[serde(
        rename = "dcid",
        default,
        deserialize_with = "id_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub data_center_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<DeviceExtra>,
    #[serde(
        rename = "firewallPolicies",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub firewall_policies: Vec<FirewallPolicy>,
}

impl Device {
    /// Render an `extra` value as a string. Strings pass through, numbers and
    /// booleans are formatted, `null`/absent yields `None`.
    pub fn extra_value(&self, key: &str) -> Option<String> {
        let entry = self.extra.iter().find(|e| e.key == key)?;
        match &entry.value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Effective power state:
    ///
    /// - switch `ONLINE` -> the value of `SYS_POWERSTATUS` (empty if absent)
    /// - switch anything else -> the switch value itself
    /// - switch absent -> empty string
    pub fn power_status(&self) -> String {
        match self.extra_value(SYS_POWERSWITCH) {
            None => String::new(),
            Some(switch) if switch == POWER_ONLINE => {
                self.extra_value(SYS_POWERSTATUS).unwrap_or_default()
            }
            Some(switch) => switch,
        }
    }
}

wire_enum! {
    FirewallDirection {
        Inbound => "INBOUND",
        Outbound => "OUTBOUND",
    }
}

wire_enum! {
    /// `DELETED` is only ever sent, in an update changeset.
    FirewallAction {
        Allow => "ALLOW",
        Deny => "DENY",
        Deleted => "DELETED",
    }
}

/// One firewall rule. Equality covers every field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallPolicy {
    pub direction: FirewallDirection,
    pub policy: FirewallAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(
        rename = "portFrom",
        default,
        deserialize_with = "opt_id_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub port_from: Option<String>,
    #[serde(
        rename = "portTo",
        default,
        deserialize_with = "opt_id_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub port_to: Option<String>,
    #[serde(rename = "ipAddressFrom", default, skip_serializing_if = "Option::is_none")]
    pub ip_address_from: Option<String>,
    #[serde(rename = "ipAddressTo", default, skip_serializing_if = "Option::is_none")]
    pub ip_address_to: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl FirewallPolicy {
    pub fn new(policy: FirewallAction, direction: FirewallDirection, order: i64) -> Self {
        Self {
            direction,
            policy,
            protocol: None,
            port_from: None,
            port_to: None,
            ip_address_from: None,
            ip_address_to: None,
            order,
            comment: None,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct DeviceGetParams<'a> {
    #[serde(rename = "deviceId")]
    pub device_id: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct DeviceGetPayload {
    #[serde(default)]
    pub device: Option<Device>,
}

#[derive(Serialize)]
pub(crate) struct FirewallUpdateParams<'a> {
    #[serde(rename = "deviceId")]
    pub device_id: &'a str,
    #[serde(rename = "firewallPolicies")]
    pub firewall_policies: &'a [FirewallPolicy],
}

/// `device.update.firewall` answers with the envelope only.
#[derive(Deserialize)]
pub(crate) struct EmptyPayload {}
