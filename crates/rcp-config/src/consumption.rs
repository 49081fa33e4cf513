//! Unused-key guard.
//!
//! "Consumed pointers" are JSON Pointer prefixes the code actually reads. A
//! leaf under any consumed prefix is consumed; any other leaf is unused and
//! most likely a typo (`/waits/timeout` instead of `/waits/timeout_secs`).

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collect_leaf_pointers;

/// Every config pointer read by `EngineSettings` and `resolve_credentials`.
pub const CONSUMED_POINTERS: &[&str] = &[
    "/rackcorp/api_address",
    "/rackcorp/http_timeout_secs",
    "/rackcorp/keys_env/api_uuid",
    "/rackcorp/keys_env/api_secret",
    "/rackcorp/keys_env/customer_id",
    "/waits/timeout_secs",
    "/waits/delay_secs",
    "/waits/min_interval_secs",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Sorted unused leaf pointers.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// With `Fail`, unused keys are an error; with `Warn`, the caller decides
/// what to do with the report.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|lp| !CONSUMED_POINTERS.iter().any(|cp| is_prefix_pointer(cp, lp)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected: {:?}",
            report.unused_leaf_pointers.len(),
            report.unused_leaf_pointers
        );
    }
    Ok(report)
}

/// `"/a/b"` consumes `"/a/b"` and `"/a/b/c"` but not `"/a/bc"`.
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    leaf == prefix
        || (leaf.starts_with(prefix) && leaf.as_bytes().get(prefix.len()) == Some(&b'/'))
}
