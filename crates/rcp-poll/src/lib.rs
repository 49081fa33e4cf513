//! rcp-poll
//!
//! Blocking "wait until attribute X reaches state Y" primitive.
//!
//! # Design
//!
//! - Synchronous by intent: the caller serializes one lifecycle operation per
//!   resource and expects a single blocking call.
//! - Only domain "still pending" states are waited on. Refresh errors and
//!   unknown states end the wait at once.
//! - Time is injected through [`Clock`]; [`FakeClock`] makes waits instant
//!   and observable in tests.

mod clock;
mod poller;

pub use clock::{Clock, FakeClock, SystemClock};
pub use poller::{wait_for, PollError, PollSpec, WaitSettings};
