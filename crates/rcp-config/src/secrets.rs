//! Credential resolution.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** under `/rackcorp/keys_env/*`.
//! - The binary calls [`resolve_credentials`] once at startup and passes the
//!   result into the client and engine constructors.
//! - `Debug` redacts the API secret.
//! - Error messages name the env var, never its value.

use anyhow::{bail, Result};
use serde_json::Value;

pub const DEFAULT_API_UUID_VAR: &str = "RACKCORP_API_UUID";
pub const DEFAULT_API_SECRET_VAR: &str = "RACKCORP_API_SECRET";
pub const DEFAULT_CUSTOMER_ID_VAR: &str = "RACKCORP_CUSTOMER_ID";

/// Account credentials and the customer orders are placed for.
#[derive(Clone)]
pub struct ResolvedCredentials {
    pub api_uuid: String,
    pub api_secret: String,
    pub customer_id: String,
}

impl std::fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("api_uuid", &self.api_uuid)
            .field("api_secret", &"<REDACTED>")
            .field("customer_id", &self.customer_id)
            .finish()
    }
}

struct CredentialEnvNames {
    api_uuid_var: String,
    api_secret_var: String,
    customer_id_var: String,
}

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_env_names(config_json: &Value) -> CredentialEnvNames {
    CredentialEnvNames {
        api_uuid_var: read_str_at(config_json, "/rackcorp/keys_env/api_uuid")
            .unwrap_or_else(|| DEFAULT_API_UUID_VAR.to_string()),
        api_secret_var: read_str_at(config_json, "/rackcorp/keys_env/api_secret")
            .unwrap_or_else(|| DEFAULT_API_SECRET_VAR.to_string()),
        customer_id_var: read_str_at(config_json, "/rackcorp/keys_env/customer_id")
            .unwrap_or_else(|| DEFAULT_CUSTOMER_ID_VAR.to_string()),
    }
}

/// Resolve credentials from the process environment.
pub fn resolve_credentials(config_json: &Value) -> Result<ResolvedCredentials> {
    resolve_credentials_with(config_json, |name| std::env::var(name).ok())
}

/// Resolve credentials through `lookup` (env var name -> value).
///
/// # Errors
/// `SECRETS_MISSING` naming the first required variable that is unset or blank.
pub fn resolve_credentials_with<F>(config_json: &Value, lookup: F) -> Result<ResolvedCredentials>
where
    F: Fn(&str) -> Option<String>,
{
    let names = parse_env_names(config_json);
    let get = |var: &str, what: &str| -> Result<String> {
        match lookup(var) {
            Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
            _ => bail!("SECRETS_MISSING: required env var '{var}' ({what}) is not set or empty"),
        }
    };

    Ok(ResolvedCredentials {
        api_uuid: get(&names.api_uuid_var, "api uuid")?,
        api_secret: get(&names.api_secret_var, "api secret")?,
        customer_id: get(&names.customer_id_var, "customer id")?,
    })
}
