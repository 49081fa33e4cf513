//! Refresh-until-target polling.
//!
//! # Behavior
//!
//! 1. Refresh immediately.
//! 2. A refresh error is returned as-is; errors are never retried here.
//! 3. State equal to the target ends the wait with the refreshed value.
//! 4. State in the pending set sleeps and loops.
//! 5. Any other state fails immediately as unexpected.
//!
//! Sleeps start at `min_interval`, double on each further wait, are capped
//! at `delay`, and never extend past the overall `timeout`.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::Clock;

/// Floor for a single sleep so a zero-length configuration still makes
/// progress towards the timeout.
const MIN_SLEEP: Duration = Duration::from_millis(1);

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Timing shared by every wait of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSettings {
    pub timeout: Duration,
    pub delay: Duration,
    pub min_interval: Duration,
}

impl Default for WaitSettings {
    /// 60 minute ceiling, 10 s between polls, 3 s minimum spacing.
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60 * 60),
            delay: Duration::from_secs(10),
            min_interval: Duration::from_secs(3),
        }
    }
}

/// One wait: which attribute, what counts as done, what counts as not yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSpec {
    pub attribute: String,
    pub pending: Vec<String>,
    pub target: String,
    pub settings: WaitSettings,
}

impl PollSpec {
    pub fn new<I, S>(attribute: impl Into<String>, pending: I, target: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attribute: attribute.into(),
            pending: pending.into_iter().map(Into::into).collect(),
            target: target.into(),
            settings: WaitSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: WaitSettings) -> Self {
        self.settings = settings;
        self
    }

    fn is_pending(&self, state: &str) -> bool {
        self.pending.iter().any(|p| p == state)
    }

    fn first_sleep(&self) -> Duration {
        self.settings
            .min_interval
            .min(self.max_sleep())
            .max(MIN_SLEEP)
    }

    fn max_sleep(&self) -> Duration {
        self.settings.delay.max(self.settings.min_interval).max(MIN_SLEEP)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum PollError<E> {
    /// The refresh function itself failed.
    Refresh { attribute: String, source: E },
    /// Still pending when the timeout elapsed.
    Timeout {
        attribute: String,
        last_state: String,
        target: String,
        timeout: Duration,
    },
    /// A state that is neither the target nor pending.
    UnexpectedState {
        attribute: String,
        state: String,
        target: String,
        pending: Vec<String>,
    },
}

impl<E> PollError<E> {
    pub fn attribute(&self) -> &str {
        match self {
            PollError::Refresh { attribute, .. }
            | PollError::Timeout { attribute, .. }
            | PollError::UnexpectedState { attribute, .. } => attribute,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::Timeout { .. })
    }
}

impl<E: fmt::Display> fmt::Display for PollError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollError::Refresh { attribute, source } => {
                write!(f, "refreshing {attribute} failed: {source}")
            }
            PollError::Timeout {
                attribute,
                last_state,
                target,
                timeout,
            } => write!(
                f,
                "timed out after {}s waiting for {attribute} to become {target:?} (last state {last_state:?})",
                timeout.as_secs()
            ),
            PollError::UnexpectedState {
                attribute,
                state,
                target,
                pending,
            } => write!(
                f,
                "unexpected {attribute} state {state:?} while waiting for {target:?} (pending: {})",
                pending.join(", ")
            ),
        }
    }
}

impl<E: Error + 'static> Error for PollError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PollError::Refresh { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Poll loop
// ---------------------------------------------------------------------------

/// Drive `refresh` until it reports `spec.target`.
///
/// `refresh` returns the fresh value together with its current state string.
pub fn wait_for<T, E, F, C>(spec: &PollSpec, clock: &C, mut refresh: F) -> Result<T, PollError<E>>
where
    F: FnMut() -> Result<(T, String), E>,
    C: Clock + ?Sized,
{
    let started = clock.now();
    let mut next_sleep = spec.first_sleep();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let (value, state) = refresh().map_err(|source| PollError::Refresh {
            attribute: spec.attribute.clone(),
            source,
        })?;

        debug!(attribute = %spec.attribute, %state, target = %spec.target, attempt, "poll");

        if state == spec.target {
            info!(attribute = %spec.attribute, %state, attempt, "poll reached target");
            return Ok(value);
        }

        if !spec.is_pending(&state) {
            warn!(attribute = %spec.attribute, %state, target = %spec.target, "poll saw unexpected state");
            return Err(PollError::UnexpectedState {
                attribute: spec.attribute.clone(),
                state,
                target: spec.target.clone(),
                pending: spec.pending.clone(),
            });
        }

        let elapsed = clock.now().saturating_sub(started);
        if elapsed >= spec.settings.timeout {
            warn!(attribute = %spec.attribute, %state, attempt, "poll timed out");
            return Err(PollError::Timeout {
                attribute: spec.attribute.clone(),
                last_state: state,
                target: spec.target.clone(),
                timeout: spec.settings.timeout,
            });
        }

        let remaining = spec.settings.timeout - elapsed;
        clock.sleep(next_sleep.min(remaining));
        next_sleep = next_sleep.saturating_mul(2).min(spec.max_sleep());
    }
}
