//! Error taxonomy for the Rackcorp API client.
//!
//! # Classification
//!
//! [`ApiError`] wraps the `{code, message, debug}` triple of a failed
//! envelope and picks the most actionable text available:
//!
//! 1. `debug` when non-empty,
//! 2. else `message`,
//! 3. else `code`,
//! 4. else a generic "unknown Rackcorp API error".
//!
//! Classification is total: it never fails and never panics, so a polling
//! loop always has a renderable error even from a malformed response.
//!
//! [`ClientError`] is what every client operation returns. Validation errors
//! are raised before any I/O; transport and codec errors wrap their cause;
//! API errors carry the classified envelope.

use std::error::Error;
use std::fmt;

use crate::wire::Envelope;

/// Boxed underlying cause, kept `Send + Sync` so errors cross thread bounds.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

const UNKNOWN_API_ERROR: &str = "unknown Rackcorp API error";

/// Diagnostic prefix the provider uses for missing objects
/// (e.g. `"Could not find device"`).
const NOT_FOUND_MARKER: &str = "could not find";

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// An application-level failure reported by the provider envelope.
#[derive(Debug)]
pub struct ApiError {
    /// The raw envelope as received.
    pub envelope: Envelope,
    /// Most specific diagnostic text available (may be empty).
    pub message: String,
    cause: Option<BoxError>,
}

impl ApiError {
    /// Classify a failed envelope.
    pub fn from_envelope(envelope: &Envelope) -> Self {
        let message = [&envelope.debug, &envelope.message, &envelope.code]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string();

        Self {
            envelope: envelope.clone(),
            message,
            cause: None,
        }
    }

    /// Shorthand for a failure with only a `code` and a `message`.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::from_envelope(&Envelope {
            code: code.into(),
            message: message.into(),
            debug: String::new(),
        })
    }

    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// `true` when the provider says the object does not exist.
    pub fn is_not_found(&self) -> bool {
        [
            &self.envelope.debug,
            &self.envelope.message,
            &self.envelope.code,
        ]
        .into_iter()
        .any(|s| s.to_ascii_lowercase().contains(NOT_FOUND_MARKER))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.message.is_empty(), &self.cause) {
            (true, None) => f.write_str(UNKNOWN_API_ERROR),
            (true, Some(cause)) => write!(f, "{cause}"),
            (false, None) => f.write_str(&self.message),
            (false, Some(cause)) => write!(f, "{}: {cause}", self.message),
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// ClientError
// ---------------------------------------------------------------------------

/// Errors returned by [`RackcorpApi`](crate::RackcorpApi) operations.
#[derive(Debug)]
pub enum ClientError {
    /// A required parameter was empty or malformed. No request was sent.
    Validation(String),
    /// The HTTP exchange itself failed (connect, TLS, timeout, body read).
    Transport {
        command: &'static str,
        source: BoxError,
    },
    /// The request could not be encoded or the response body could not be decoded.
    Codec {
        command: &'static str,
        detail: String,
    },
    /// The provider answered with `code != "OK"` or without the expected payload.
    Api {
        command: &'static str,
        error: ApiError,
    },
}

impl ClientError {
    pub(crate) fn required(parameter: &str) -> Self {
        ClientError::Validation(format!("{parameter} parameter is required"))
    }

    pub fn transport(command: &'static str, source: impl Into<BoxError>) -> Self {
        ClientError::Transport {
            command,
            source: source.into(),
        }
    }

    pub fn api(command: &'static str, error: ApiError) -> Self {
        ClientError::Api { command, error }
    }

    /// The provider command this error belongs to, if a request was attempted.
    pub fn command(&self) -> Option<&'static str> {
        match self {
            ClientError::Validation(_) => None,
            ClientError::Transport { command, .. }
            | ClientError::Codec { command, .. }
            | ClientError::Api { command, .. } => Some(command),
        }
    }

    /// `true` only for a classified "could not find ..." API error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { error, .. } if error.is_not_found())
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Validation(msg) => write!(f, "validation error: {msg}"),
            ClientError::Transport { command, source } => {
                write!(f, "transport error on {command}: {source}")
            }
            ClientError::Codec { command, detail } => {
                write!(f, "codec error on {command}: {detail}")
            }
            ClientError::Api { command, error } => write!(f, "api error on {command}: {error}"),
        }
    }
}

impl Error for ClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ClientError::Transport { source, .. } => Some(source.as_ref()),
            ClientError::Api { error, .. } => Some(error),
            _ => None,
        }
    }
}
