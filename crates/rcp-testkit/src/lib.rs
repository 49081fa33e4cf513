//! rcp-testkit
//!
//! Scripted fake provider plus fixtures for lifecycle scenarios.

mod fake;
pub mod fixtures;

pub use fake::{Call, Command, FakeRackcorp, Reply};
