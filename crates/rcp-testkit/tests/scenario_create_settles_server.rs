//! Scenario: Create drives a server from order to ONLINE.
//!
//! # Invariants under test
//!
//! 1. Stages run in order: order.create, order.confirm, contract poll,
//!    transaction drain, STARTUP, power poll.
//! 2. The settled store carries id = order id plus contract/device ids and
//!    the effective power status.
//! 3. A confirm result with other than exactly one contract id aborts with a
//!    shape violation, after the order id is already stored.

use rcp_api::{ContractStatus, TransactionType};
use rcp_engine::store::{
    CONTRACT_ID, CONTRACT_STATUS, DATA_CENTER_ID, DEVICE_ID, DEVICE_STATUS, NAME, PRIMARY_IP,
};
use rcp_engine::{AttributeStore, EngineError, Provisioner, Stage};
use rcp_poll::FakeClock;
use rcp_testkit::fixtures::*;
use rcp_testkit::{Command, FakeRackcorp, Reply};

fn happy_fake() -> FakeRackcorp {
    let fake = FakeRackcorp::new();
    fake.reply(Command::OrderCreate, Reply::Created(created("123")))
        .reply(Command::OrderConfirm, Reply::Confirmed(confirmed(&["543"])))
        .replies(
            Command::OrderContractGet,
            [
                Reply::Contract(contract_pending("543")),
                Reply::Contract(contract_active("543", "678")),
            ],
        )
        .reply(Command::TransactionGetAll, Reply::Page(empty_page()))
        .reply(
            Command::TransactionCreate,
            Reply::Transaction(transaction("141414", "678", None)),
        )
        .replies(
            Command::DeviceGet,
            [
                Reply::Device(device_offline("678")),
                Reply::Device(device("678", Some("ONLINE"), Some("OFFLINE"))),
                Reply::Device(device_online("678")),
            ],
        );
    fake
}

#[test]
fn scenario_create_settles_server_online() {
    let fake = happy_fake();
    let clock = FakeClock::new();
    let engine = Provisioner::new(&fake, CUSTOMER_ID, &clock);
    let mut store = server_store();

    engine.create(&mut store).unwrap();

    assert_eq!(store.id().as_deref(), Some("123"));
    assert_eq!(attr(&store, CONTRACT_ID).as_deref(), Some("543"));
    assert_eq!(attr(&store, DEVICE_ID).as_deref(), Some("678"));
    assert_eq!(attr(&store, DEVICE_STATUS).as_deref(), Some("ONLINE"));
    assert_eq!(attr(&store, CONTRACT_STATUS).as_deref(), Some("ACTIVE"));
    assert_eq!(attr(&store, NAME).as_deref(), Some("server-678"));
    assert_eq!(attr(&store, PRIMARY_IP).as_deref(), Some("203.0.113.10"));
    assert_eq!(attr(&store, DATA_CENTER_ID).as_deref(), Some("3"));

    assert_eq!(fake.product_codes(), vec!["SERVER_VIRTUAL_PERFORMANCE_AU".to_string()]);
    assert_eq!(
        fake.transactions_created(),
        vec![(TransactionType::Startup, "678".to_string(), false)]
    );

    // One sleep while the contract is pending, two while the device boots.
    assert_eq!(clock.sleeps().len(), 3);
}

#[test]
fn scenario_create_stage_order_is_strict() {
    let fake = happy_fake();
    let clock = FakeClock::new();
    Provisioner::new(&fake, CUSTOMER_ID, &clock)
        .create(&mut server_store())
        .unwrap();

    let mut seen = fake.commands();
    seen.dedup();
    assert_eq!(
        seen,
        vec![
            Command::OrderCreate,
            Command::OrderConfirm,
            Command::OrderContractGet,
            Command::TransactionGetAll,
            Command::TransactionCreate,
            Command::DeviceGet,
        ]
    );
}

#[test]
fn scenario_create_waits_for_outstanding_transactions() {
    let fake = FakeRackcorp::new();
    fake.reply(Command::OrderCreate, Reply::Created(created("123")))
        .reply(Command::OrderConfirm, Reply::Confirmed(confirmed(&["543"])))
        .reply(Command::OrderContractGet, Reply::Contract(contract_active("543", "678")))
        .replies(
            Command::TransactionGetAll,
            [
                Reply::Page(busy_page("678", 2)),
                Reply::Page(busy_page("678", 1)),
                Reply::Page(empty_page()),
            ],
        )
        .reply(
            Command::TransactionCreate,
            Reply::Transaction(transaction("141414", "678", None)),
        )
        .reply(Command::DeviceGet, Reply::Device(device_online("678")));

    let clock = FakeClock::new();
    Provisioner::new(&fake, CUSTOMER_ID, &clock)
        .create(&mut server_store())
        .unwrap();

    assert_eq!(fake.count(Command::TransactionGetAll), 3);
    assert_eq!(clock.sleeps().len(), 2);
    // STARTUP only after the queue drained.
    let commands = fake.commands();
    let last_drain = commands
        .iter()
        .rposition(|c| *c == Command::TransactionGetAll)
        .unwrap();
    let startup = commands
        .iter()
        .position(|c| *c == Command::TransactionCreate)
        .unwrap();
    assert!(last_drain < startup);
}

#[test]
fn scenario_confirm_with_two_contracts_is_shape_violation() {
    let fake = FakeRackcorp::new();
    fake.reply(Command::OrderCreate, Reply::Created(created("123")))
        .reply(
            Command::OrderConfirm,
            Reply::Confirmed(confirmed(&["543", "544"])),
        );
    let clock = FakeClock::new();
    let mut store = server_store();

    let err = Provisioner::new(&fake, CUSTOMER_ID, &clock)
        .create(&mut store)
        .unwrap_err();

    match &err {
        EngineError::ShapeViolation { stage, detail } => {
            assert_eq!(*stage, Stage::Confirming);
            assert!(detail.contains("2 contracts"), "{detail}");
        }
        other => panic!("expected shape violation, got {other}"),
    }
    // The order exists remotely; its id is kept so Read/Delete can reconcile.
    assert_eq!(store.id().as_deref(), Some("123"));
    assert_eq!(fake.count(Command::OrderContractGet), 0);
}

#[test]
fn scenario_order_failure_aborts_before_confirm() {
    let fake = FakeRackcorp::new();
    fake.fail(Command::OrderCreate, "FAULT", "Product code unknown");
    let clock = FakeClock::new();
    let mut store = server_store();

    let err = Provisioner::new(&fake, CUSTOMER_ID, &clock)
        .create(&mut store)
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Ordering));
    assert!(err.to_string().contains("Product code unknown"), "{err}");
    assert_eq!(store.id(), None);
    assert_eq!(fake.count(Command::OrderConfirm), 0);
}

#[test]
fn scenario_missing_required_attribute_makes_no_call() {
    let fake = FakeRackcorp::new();
    let clock = FakeClock::new();
    let mut store = server_store();
    store.attributes.remove(rcp_engine::store::OPERATING_SYSTEM);

    let err = Provisioner::new(&fake, CUSTOMER_ID, &clock)
        .create(&mut store)
        .unwrap_err();

    assert!(matches!(err, EngineError::Validation(_)), "{err}");
    assert!(fake.calls().is_empty());
}

#[test]
fn scenario_device_id_persisted_before_activation_failure() {
    let fake = FakeRackcorp::new();
    fake.reply(Command::OrderCreate, Reply::Created(created("123")))
        .reply(Command::OrderConfirm, Reply::Confirmed(confirmed(&["543"])))
        .replies(
            Command::OrderContractGet,
            [
                Reply::Contract(contract("543", ContractStatus::Pending, "678")),
                Reply::Contract(contract("543", ContractStatus::Other("SUSPENDED".into()), "678")),
            ],
        );
    let clock = FakeClock::new();
    let mut store = server_store();

    let err = Provisioner::new(&fake, CUSTOMER_ID, &clock)
        .create(&mut store)
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::AwaitingContract));
    assert!(err.to_string().contains("SUSPENDED"), "{err}");
    assert_eq!(attr(&store, DEVICE_ID).as_deref(), Some("678"));
    assert_eq!(fake.count(Command::TransactionCreate), 0);
}
