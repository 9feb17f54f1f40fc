//! Tests for bridge.rs

use kodegen_call_notify::*;
use serde_json::{Value, json};
use tokio_test::{assert_err, assert_ok};

fn bridge() -> MethodBridge {
    let coordinator = CallCoordinator::with_runtime(PresentationBackendFactory::create_default(), None);
    MethodBridge::new(coordinator)
}

fn initialize(bridge: &MethodBridge) {
    let arguments = json!({
        "androidChannelId": "c1",
        "androidChannelName": "Calls",
        "androidFullScreenIntentActivity": "app.Incoming",
        "ringTimeoutMs": 45000
    });
    assert_eq!(assert_ok!(bridge.handle("initialize", &arguments)), Value::Null);
}

fn remote_message(room_id: &str) -> Value {
    json!({
        "type": "call_audio",
        "roomId": room_id,
        "callerId": "u1",
        "callerName": "Alice",
        "receiverId": "u2",
        "badge": 3
    })
}

#[test]
fn test_initialize_errors() {
    let bridge = bridge();

    let err = assert_err!(bridge.handle("initialize", &Value::Null));
    assert_eq!(err.code, BridgeErrorCode::InvalidArgument);

    let err = assert_err!(bridge.handle("initialize", &json!({ "androidChannelId": "c1" })));
    assert_eq!(err.code, BridgeErrorCode::InvalidConfig);
    assert!(!bridge.coordinator().is_configured());

    initialize(&bridge);
    assert!(bridge.coordinator().is_configured());
}

#[test]
fn test_remote_message_and_status_update() {
    let bridge = bridge();
    initialize(&bridge);
    let mut events = bridge.event_stream();

    assert_eq!(
        bridge.handle("handleRemoteMessage", &remote_message("r1")),
        Ok(Value::Null)
    );
    let ringing = events.try_recv().unwrap();
    assert_eq!(ringing.to_value()["status"], "ringing");
    assert_eq!(ringing.to_value()["payload"]["callerName"], "Alice");

    assert_eq!(
        bridge.handle("updateStatus", &json!({ "roomId": "r1", "status": "answered" })),
        Ok(Value::Null)
    );
    let answered = events.try_recv().unwrap();
    assert_eq!(answered.status, CallState::Answered);
    assert!(bridge.coordinator().current_call().is_none());
}

#[test]
fn test_update_status_errors() {
    let bridge = bridge();
    initialize(&bridge);
    assert_ok!(bridge.handle("handleRemoteMessage", &remote_message("r1")));

    let err = assert_err!(bridge.handle("updateStatus", &json!({ "roomId": "r1" })));
    assert_eq!(err.code, BridgeErrorCode::InvalidArgument);

    let err = assert_err!(
        bridge.handle("updateStatus", &json!({ "roomId": "r1", "status": "ended" }))
    );
    assert_eq!(err.code, BridgeErrorCode::InvalidStatus);
    assert_eq!(err.to_string(), "INVALID_STATUS: Unknown status: ended");
    assert!(bridge.coordinator().current_call().is_some());

    // Mismatched room is not an error for the caller
    assert_eq!(
        bridge.handle("updateStatus", &json!({ "roomId": "r9", "status": "declined" })),
        Ok(Value::Null)
    );
    assert!(bridge.coordinator().current_call().is_some());
}

#[test]
fn test_unknown_method() {
    let err = assert_err!(bridge().handle("getActiveCall", &Value::Null));
    assert_eq!(err.code, BridgeErrorCode::NotImplemented);

    let encoded = serde_json::to_value(&err).unwrap();
    assert_eq!(encoded["code"], "NOT_IMPLEMENTED");
}

#[test]
fn test_remote_message_without_arguments() {
    let err = assert_err!(bridge().handle("handleRemoteMessage", &json!(["type", "call_audio"])));
    assert_eq!(err.code, BridgeErrorCode::InvalidArgument);
}
