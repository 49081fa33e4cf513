//! Scenario: the HTTP client against a served provider endpoint.
//!
//! # Invariants under test
//!
//! - Every request is a signed POST carrying `APIUUID`, `APISECRET` and `cmd`.
//! - `code != "OK"` is an API error even on HTTP 200, classified debug-first.
//! - An OK envelope missing its payload is an API error.
//! - Empty required parameters fail before any request is sent.

use httpmock::prelude::*;
use rcp_api::*;
use serde_json::json;

const PATH: &str = "/api/rest/v1/json.php";

fn client(server: &MockServer) -> RackcorpClient {
    RackcorpClient::new("test-uuid", "test-secret")
        .unwrap()
        .with_address(server.url(PATH))
}

#[test]
fn scenario_order_get_signs_request_and_decodes_order() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(POST)
            .path(PATH)
            .body_contains("\"APIUUID\":\"test-uuid\"")
            .body_contains("\"APISECRET\":\"test-secret\"")
            .body_contains("\"cmd\":\"order.get\"")
            .body_contains("\"orderId\":\"123\"");
        then.status(200).json_body(json!({
            "code": "OK",
            "message": "Order retrieved",
            "order": {"orderId": "123", "customerId": "456", "status": "ACCEPTED", "contractId": "543"}
        }));
    });

    let order = client(&server).order_get("123").unwrap();
    m.assert();
    assert_eq!(order.order_id, "123");
    assert_eq!(order.contract_id, "543");
    assert_eq!(order.status, Some(OrderStatus::Accepted));
}

#[test]
fn scenario_confirm_returns_single_contract_id() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(PATH).body_contains("\"cmd\":\"order.confirm\"");
        then.status(200)
            .json_body(json!({"code": "OK", "message": "", "contractID": [543]}));
    });

    let confirmed = client(&server).order_confirm("123").unwrap();
    assert_eq!(confirmed.contract_ids, vec!["543".to_string()]);
}

#[test]
fn scenario_confirm_without_contract_ids_is_api_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(PATH).body_contains("\"cmd\":\"order.confirm\"");
        then.status(200).json_body(json!({"code": "OK", "contractID": []}));
    });

    let err = client(&server).order_confirm("123").unwrap_err();
    assert!(matches!(err, ClientError::Api { command: "order.confirm", .. }), "got {err}");
}

#[test]
fn scenario_fault_envelope_on_http_200_is_classified() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(PATH).body_contains("\"cmd\":\"device.get\"");
        then.status(200).json_body(json!({
            "code": "FAULT",
            "message": "Failed",
            "debug": "Could not find device"
        }));
    });

    let err = client(&server).device_get("678").unwrap_err();
    assert!(err.is_not_found());
    match err {
        ClientError::Api { command, error } => {
            assert_eq!(command, "device.get");
            assert_eq!(error.to_string(), "Could not find device");
            assert_eq!(error.envelope.code, "FAULT");
        }
        other => panic!("expected api error, got {other}"),
    }
}

#[test]
fn scenario_non_json_body_is_codec_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(PATH);
        then.status(502).body("<html>bad gateway</html>");
    });

    let err = client(&server).order_get("123").unwrap_err();
    assert!(matches!(err, ClientError::Codec { command: "order.get", .. }), "got {err}");
}

#[test]
fn scenario_ok_without_payload_is_api_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(PATH).body_contains("\"cmd\":\"order.contract.get\"");
        then.status(200).json_body(json!({"code": "OK"}));
    });

    let err = client(&server).order_contract_get("543").unwrap_err();
    assert!(matches!(err, ClientError::Api { .. }), "got {err}");
    assert!(!err.is_not_found());
}

#[test]
fn scenario_empty_required_parameters_never_hit_the_network() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(POST).path(PATH);
        then.status(200).json_body(json!({"code": "OK"}));
    });
    let c = client(&server);

    let details = ProductDetails::default();
    let results = vec![
        c.order_get("").map(|_| ()),
        c.order_confirm("").map(|_| ()),
        c.order_contract_get("").map(|_| ()),
        c.device_get("").map(|_| ()),
        c.device_update_firewall("", &[]),
        c.transaction_get("").map(|_| ()),
        c.order_create("", "456", &details).map(|_| ()),
        c.order_create("SERVER_VIRTUAL_PERFORMANCE_AU", "", &details).map(|_| ()),
        c.transaction_create(
            &TransactionType::Other(String::new()),
            &TransactionObjectType::Device,
            "678",
            false,
        )
        .map(|_| ()),
        c.transaction_create(
            &TransactionType::Startup,
            &TransactionObjectType::Other(String::new()),
            "678",
            false,
        )
        .map(|_| ()),
        c.transaction_create(&TransactionType::Startup, &TransactionObjectType::Device, "", false)
            .map(|_| ()),
    ];

    for r in results {
        assert!(matches!(r, Err(ClientError::Validation(_))), "got {r:?}");
    }
    m.assert_hits(0);
}

#[test]
fn scenario_transaction_create_and_get() {
    let server = MockServer::start();
    let create = server.mock(|when, then| {
        when.method(POST)
            .path(PATH)
            .body_contains("\"cmd\":\"rctransaction.create\"")
            .body_contains("\"type\":\"CANCEL\"")
            .body_contains("\"objType\":\"DEVICE\"")
            .body_contains("\"objId\":\"678\"")
            .body_contains("\"confirmation\":true");
        then.status(200).json_body(json!({
            "code": "OK",
            "rcTransaction": {
                "rcTransactionId": 141414,
                "confirmationRequired": false,
                "confirmationText": "",
                "objType": "DEVICE",
                "objId": "678",
                "type": "CANCEL"
            }
        }));
    });
    let get = server.mock(|when, then| {
        when.method(POST)
            .path(PATH)
            .body_contains("\"cmd\":\"rctransaction.get\"")
            .body_contains("\"rcTransactionId\":141414");
        then.status(200).json_body(json!({
            "code": "OK",
            "rcTransaction": {
                "rcTransactionId": "141414",
                "objType": "DEVICE",
                "objId": "678",
                "status": "COMMENCED",
                "statusInfo": "Cancelling",
                "method": "",
                "data": null
            }
        }));
    });

    let c = client(&server);
    let t = c
        .transaction_create(&TransactionType::Cancel, &TransactionObjectType::Device, "678", true)
        .unwrap();
    assert_eq!(t.transaction_id, "141414");
    assert_eq!(t.transaction_type, Some(TransactionType::Cancel));

    let t = c.transaction_get(&t.transaction_id).unwrap();
    assert_eq!(t.status, Some(TransactionStatus::Commenced));
    assert_eq!(t.status_info, "Cancelling");
    assert_eq!(t.data, "");

    create.assert();
    get.assert();
}

#[test]
fn scenario_transaction_get_all_sends_flattened_filter() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(POST)
            .path(PATH)
            .body_contains("\"cmd\":\"rctransaction.getall\"")
            .body_contains("\"objId\":[\"678\"]")
            .body_contains("\"status\":[\"PENDING\",\"COMMENCED\"]");
        then.status(200).json_body(json!({
            "code": "OK",
            "rcTransactions": [],
            "matchedTransactions": 0
        }));
    });

    let page = client(&server)
        .transaction_get_all(&TransactionFilter::outstanding_for_device("678"))
        .unwrap();
    m.assert();
    assert!(page.is_empty());
}

#[test]
fn scenario_firewall_update_posts_changeset() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(POST)
            .path(PATH)
            .body_contains("\"cmd\":\"device.update.firewall\"")
            .body_contains("\"deviceId\":\"678\"")
            .body_contains("\"policy\":\"DELETED\"");
        then.status(200).json_body(json!({"code": "OK", "message": "Firewall updated"}));
    });

    let deleted = FirewallPolicy::new(FirewallAction::Deleted, FirewallDirection::Inbound, 1);
    client(&server)
        .device_update_firewall("678", &[deleted])
        .unwrap();
    m.assert();
}
