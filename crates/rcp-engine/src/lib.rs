//! rcp-engine
//!
//! Provisioning state machine for Rackcorp virtual servers.
//!
//! # Design
//!
//! - [`Provisioner`] exposes the four lifecycle entry points
//!   (create/read/update/delete). Each call is one blocking operation that
//!   returns only once the resource is settled or has definitively failed.
//! - The caller owns all state through [`AttributeStore`]; nothing is
//!   persisted by the engine itself.
//! - The API client and the clock are injected, so the whole machine runs
//!   against scripted fakes in tests.

mod error;
mod firewall;
mod provisioner;
mod server;
mod stage;
pub mod store;

pub use error::EngineError;
pub use firewall::{diff_policies, FirewallChangeset};
pub use provisioner::{Provisioner, ReadOutcome};
pub use server::{NicAttr, ServerSpec, StorageAttr};
pub use stage::Stage;
pub use store::{AttributeStore, MemoryStore, StoreError};

pub use rcp_poll::WaitSettings;
