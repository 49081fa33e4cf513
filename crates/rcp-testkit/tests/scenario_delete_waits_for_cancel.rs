//! Scenario: Delete cancels the device and waits for the cancellation.
//!
//! # Invariants under test
//!
//! 1. A confirmed CANCEL transaction is issued for the stored device id.
//! 2. The cancel transaction is polled PENDING -> COMMENCED -> COMPLETED and
//!    the stored id is cleared only afterwards.
//! 3. A device the provider no longer knows is treated as already deleted.
//! 4. A failed cancellation keeps the id so Delete can be retried.

use rcp_api::{TransactionStatus, TransactionType};
use rcp_engine::{AttributeStore, EngineError, MemoryStore, Provisioner, Stage};
use rcp_poll::FakeClock;
use rcp_testkit::fixtures::*;
use rcp_testkit::{Command, FakeRackcorp, Reply};

fn cancel_created() -> Reply {
    Reply::Transaction(transaction("141415", "678", None))
}

#[test]
fn scenario_delete_polls_cancel_to_completion() {
    let fake = FakeRackcorp::new();
    fake.reply(Command::TransactionCreate, cancel_created())
        .replies(
            Command::TransactionGet,
            [
                Reply::Transaction(transaction("141415", "678", Some(TransactionStatus::Pending))),
                Reply::Transaction(transaction("141415", "678", Some(TransactionStatus::Commenced))),
                Reply::Transaction(transaction("141415", "678", Some(TransactionStatus::Completed))),
            ],
        );
    let clock = FakeClock::new();
    let mut store = provisioned_store("123", "678");

    Provisioner::new(&fake, CUSTOMER_ID, &clock)
        .delete(&mut store)
        .unwrap();

    assert_eq!(
        fake.transactions_created(),
        vec![(TransactionType::Cancel, "678".to_string(), true)]
    );
    assert_eq!(fake.count(Command::TransactionGet), 3);
    assert!(fake
        .calls()
        .iter()
        .filter(|c| c.command == Command::TransactionGet)
        .all(|c| c.target == "141415"));
    assert_eq!(clock.sleeps().len(), 2);
    assert!(!has_id(&store));
}

#[test]
fn scenario_delete_of_vanished_device_succeeds() {
    let fake = FakeRackcorp::new();
    fake.fail(Command::TransactionCreate, "FAULT", "Could not find device 678");
    let clock = FakeClock::new();
    let mut store = provisioned_store("123", "678");

    Provisioner::new(&fake, CUSTOMER_ID, &clock)
        .delete(&mut store)
        .unwrap();

    assert!(!has_id(&store));
    assert_eq!(fake.count(Command::TransactionGet), 0);
}

#[test]
fn scenario_delete_timeout_keeps_id() {
    let fake = FakeRackcorp::new();
    fake.reply(Command::TransactionCreate, cancel_created()).reply(
        Command::TransactionGet,
        Reply::Transaction(transaction("141415", "678", Some(TransactionStatus::Commenced))),
    );
    let clock = FakeClock::new();
    let mut store = provisioned_store("123", "678");

    let err = Provisioner::new(&fake, CUSTOMER_ID, &clock)
        .with_waits(quick_waits())
        .delete(&mut store)
        .unwrap_err();

    match &err {
        EngineError::Poll { stage, source } => {
            assert_eq!(*stage, Stage::Cancelling);
            assert!(source.is_timeout());
        }
        other => panic!("expected poll timeout, got {other}"),
    }
    assert_eq!(store.id().as_deref(), Some("123"));
    assert_eq!(clock.total_slept(), quick_waits().timeout);
}

#[test]
fn scenario_delete_without_device_id_is_validation() {
    let fake = FakeRackcorp::new();
    let clock = FakeClock::new();
    let mut store = MemoryStore::new();
    store.set_id("123").unwrap();

    let err = Provisioner::new(&fake, CUSTOMER_ID, &clock)
        .delete(&mut store)
        .unwrap_err();

    assert!(matches!(err, EngineError::Validation(_)), "{err}");
    assert!(fake.calls().is_empty());
}
