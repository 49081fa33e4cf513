use std::error::Error;
use std::fmt;

use rcp_api::ClientError;
use rcp_poll::PollError;

use crate::stage::Stage;
use crate::store::StoreError;

/// Failure of a Create/Read/Update/Delete call.
#[derive(Debug)]
pub enum EngineError {
    /// Bad or missing input attributes. Raised before any remote call.
    Validation(String),
    /// A remote call failed outside of a poll.
    Client {
        stage: Stage,
        context: String,
        source: ClientError,
    },
    /// The provider answered successfully with something the engine cannot
    /// continue from (e.g. two contract ids for one order).
    ShapeViolation { stage: Stage, detail: String },
    /// A wait failed: refresh error, timeout or unexpected state.
    Poll {
        stage: Stage,
        source: PollError<ClientError>,
    },
    Store(StoreError),
}

impl EngineError {
    pub(crate) fn client(stage: Stage, context: impl Into<String>, source: ClientError) -> Self {
        EngineError::Client {
            stage,
            context: context.into(),
            source,
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            EngineError::Client { stage, .. }
            | EngineError::ShapeViolation { stage, .. }
            | EngineError::Poll { stage, .. } => Some(*stage),
            EngineError::Validation(_) | EngineError::Store(_) => None,
        }
    }

    /// The provider reported the object as missing, directly or while polling.
    pub fn is_not_found(&self) -> bool {
        match self {
            EngineError::Client { source, .. } => source.is_not_found(),
            EngineError::Poll {
                source: PollError::Refresh { source, .. },
                ..
            } => source.is_not_found(),
            _ => false,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "validation error: {msg}"),
            EngineError::Client {
                stage,
                context,
                source,
            } => write!(f, "[{stage}] {context}: {source}"),
            EngineError::ShapeViolation { stage, detail } => {
                write!(f, "[{stage}] unexpected provider response: {detail}")
            }
            EngineError::Poll { stage, source } => write!(f, "[{stage}] {source}"),
            EngineError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EngineError::Client { source, .. } => Some(source),
            EngineError::Poll { source, .. } => Some(source),
            EngineError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e)
    }
}
