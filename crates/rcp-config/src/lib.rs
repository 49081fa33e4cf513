//! rcp-config
//!
//! Layered YAML configuration for the provisioning engine.
//!
//! - Documents merge in order; later documents override earlier ones key by
//!   key (objects merge deeply, everything else is replaced).
//! - The merged config is canonicalized and hashed (SHA-256, hex) so a run
//!   can be tied to the exact settings it used.
//! - Literal secrets are rejected. Credentials are configured as env var
//!   NAMES and resolved separately (see [`resolve_credentials`]).

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::time::Duration;

use rcp_poll::WaitSettings;

mod consumption;
mod secrets;

pub use consumption::{report_unused_keys, UnusedKeyPolicy, UnusedKeyReport, CONSUMED_POINTERS};
pub use secrets::{resolve_credentials, resolve_credentials_with, ResolvedCredentials};

/// Production Rackcorp endpoint.
pub const DEFAULT_API_ADDRESS: &str = "https://api.rackcorp.net/api/rest/v1/json.php";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_WAIT_DELAY_SECS: u64 = 10;
pub const DEFAULT_WAIT_MIN_INTERVAL_SECS: u64 = 3;

/// Known secret-like prefixes. A leaf string starting with one of these
/// aborts loading with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "gho_",       // GitHub OAuth
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
    "xoxp-",      // Slack user token
];

/// Config keys whose values must always be env var names, never literals.
const CREDENTIAL_KEY_NAMES: &[&str] = &["apisecret", "api_secret", "password", "secret"];

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        // An empty document parses as null; treat it as "no overrides".
        if v_yaml.is_null() {
            continue;
        }
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Secret guard
// ---------------------------------------------------------------------------

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        let Some(s) = v.pointer(&ptr).and_then(Value::as_str) else {
            continue;
        };
        if looks_like_secret(s) {
            bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
        }
        if is_credential_key(&ptr) && !s.trim().is_empty() && !looks_like_env_name(s) {
            bail!(
                "CONFIG_SECRET_DETECTED leaf={} value=REDACTED (expected an env var name)",
                ptr
            );
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

fn is_credential_key(pointer: &str) -> bool {
    let last = pointer.rsplit('/').next().unwrap_or_default().to_ascii_lowercase();
    CREDENTIAL_KEY_NAMES.contains(&last.as_str())
}

/// `UPPER_SNAKE_CASE` only.
fn looks_like_env_name(s: &str) -> bool {
    let t = s.trim();
    t.chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase() || c == '_')
        && t.chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

pub(crate) fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            let p = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            };
            out.push(p);
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

// ---------------------------------------------------------------------------
// Engine settings
// ---------------------------------------------------------------------------

/// Non-secret settings the engine and client consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub api_address: String,
    pub http_timeout: Duration,
    pub waits: WaitSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            api_address: DEFAULT_API_ADDRESS.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            waits: WaitSettings {
                timeout: Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS),
                delay: Duration::from_secs(DEFAULT_WAIT_DELAY_SECS),
                min_interval: Duration::from_secs(DEFAULT_WAIT_MIN_INTERVAL_SECS),
            },
        }
    }
}

impl EngineSettings {
    /// Read settings from a merged config, falling back to defaults for
    /// absent keys. Present-but-malformed values are errors.
    pub fn from_config_json(config: &Value) -> Result<Self> {
        let api_address = match config.pointer("/rackcorp/api_address") {
            None | Some(Value::Null) => DEFAULT_API_ADDRESS.to_string(),
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(_) => bail!("CONFIG_INVALID leaf=/rackcorp/api_address expected non-empty string"),
        };

        Ok(Self {
            api_address,
            http_timeout: secs_at(config, "/rackcorp/http_timeout_secs", DEFAULT_HTTP_TIMEOUT_SECS)?,
            waits: WaitSettings {
                timeout: secs_at(config, "/waits/timeout_secs", DEFAULT_WAIT_TIMEOUT_SECS)?,
                delay: secs_at(config, "/waits/delay_secs", DEFAULT_WAIT_DELAY_SECS)?,
                min_interval: secs_at(
                    config,
                    "/waits/min_interval_secs",
                    DEFAULT_WAIT_MIN_INTERVAL_SECS,
                )?,
            },
        })
    }
}

fn secs_at(config: &Value, pointer: &str, default: u64) -> Result<Duration> {
    match config.pointer(pointer) {
        None | Some(Value::Null) => Ok(Duration::from_secs(default)),
        Some(v) => match v.as_u64() {
            Some(n) => Ok(Duration::from_secs(n)),
            None => bail!("CONFIG_INVALID leaf={pointer} expected non-negative integer seconds"),
        },
    }
}
