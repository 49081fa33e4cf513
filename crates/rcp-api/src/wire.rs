//! Envelope codec shared by every Rackcorp command.
//!
//! Every request body is `{APIUUID, APISECRET, cmd, ...params}` and every
//! response body is `{code, message, debug, ...payload}`. The command payload
//! types live next to the domain types; this module only owns the envelope
//! and the lenient field decoders the provider needs.

use serde::{Deserialize, Deserializer, Serialize};

/// Response `code` value signalling success. Anything else is a failure,
/// whatever the HTTP status was.
pub const CODE_OK: &str = "OK";

/// Declares a closed string enum for a provider status/command vocabulary.
///
/// Unknown wire values are preserved verbatim in `Other` so decoding never
/// fails on a value this client has not seen yet, and re-encoding is lossless.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A value not known to this client, kept as sent.
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $wire, )+
                    Self::Other(s) => s.as_str(),
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                match s.as_str() {
                    $( $wire => Self::$variant, )+
                    _ => Self::Other(s),
                }
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from(s.to_string())
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> String {
                match v {
                    $name::Other(s) => s,
                    known => known.as_str().to_string(),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::Other(String::new())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Signed request envelope. Deliberately not `Debug`: it carries the secret.
#[derive(Serialize)]
pub(crate) struct Request<'a, P: Serialize> {
    #[serde(rename = "APIUUID")]
    pub api_uuid: &'a str,
    #[serde(rename = "APISECRET")]
    pub api_secret: &'a str,
    pub cmd: &'a str,
    #[serde(flatten)]
    pub params: P,
}

/// The status triple present on every response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, deserialize_with = "nullable_string")]
    pub code: String,
    #[serde(
        default,
        deserialize_with = "nullable_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub message: String,
    #[serde(
        default,
        deserialize_with = "nullable_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub debug: String,
}

impl Envelope {
    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}

/// `null` and absent both decode to the empty string.
pub(crate) fn nullable_string<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Int(n) => n.to_string(),
        }
    }
}

/// Provider identifiers arrive as strings in some commands and integers in
/// others (`orderId` on create, `contractID` on confirm). Surface them all
/// as `String`.
pub(crate) fn id_string<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(d)?
        .map(RawId::into_string)
        .unwrap_or_default())
}

/// Optional form of [`id_string`]; absent and `null` stay `None`.
pub(crate) fn opt_id_string<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(d)?.map(RawId::into_string))
}

/// List form of [`id_string`].
pub(crate) fn id_list<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<RawId>>::deserialize(d)?
        .unwrap_or_default()
        .into_iter()
        .map(RawId::into_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Ids {
        #[serde(default, deserialize_with = "id_string")]
        one: String,
        #[serde(default, deserialize_with = "id_list")]
        many: Vec<String>,
    }

    #[test]
    fn ids_decode_from_numbers_and_strings() {
        let v: Ids = serde_json::from_str(r#"{"one": 123, "many": [543, "544"]}"#).unwrap();
        assert_eq!(v.one, "123");
        assert_eq!(v.many, vec!["543".to_string(), "544".to_string()]);
    }

    #[test]
    fn null_and_missing_ids_are_empty() {
        let v: Ids = serde_json::from_str(r#"{"one": null}"#).unwrap();
        assert_eq!(v.one, "");
        assert!(v.many.is_empty());
    }

    #[test]
    fn envelope_tolerates_null_debug() {
        let env: Envelope =
            serde_json::from_str(r#"{"code":"FAULT","message":"bad","debug":null}"#).unwrap();
        assert_eq!(env.code, "FAULT");
        assert_eq!(env.debug, "");
        assert!(!env.is_ok());
    }

    #[test]
    fn envelope_omits_empty_diagnostics_on_the_wire() {
        let env = Envelope {
            code: CODE_OK.to_string(),
            ..Envelope::default()
        };
        assert_eq!(serde_json::to_string(&env).unwrap(), r#"{"code":"OK"}"#);
    }
}
