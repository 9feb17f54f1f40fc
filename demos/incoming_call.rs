//! Example: Incoming call lifecycle with the headless driver
//!
//! Rings a call from a push payload, lets a remote status update end it, then
//! rings a second call that times out.
//!
//! Run with: cargo run --example incoming_call

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use kodegen_call_notify::{
    CallCoordinatorBuilder, CallEvent, CallNotifyConfig, CallNotifyResult, CallState,
    MethodBridge, PresentationBackendFactory,
};
use serde_json::json;

fn push_data(room_id: &str, caller: &str) -> HashMap<String, String> {
    HashMap::from([
        ("type".to_string(), "call_video".to_string()),
        ("roomId".to_string(), room_id.to_string()),
        ("callerId".to_string(), format!("{}-id", caller.to_lowercase())),
        ("callerName".to_string(), caller.to_string()),
        ("receiverId".to_string(), "me".to_string()),
        ("metadata".to_string(), r#"{"groupCall":false}"#.to_string()),
    ])
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let driver = PresentationBackendFactory::headless();
    let printer = |event: &CallEvent| -> CallNotifyResult<()> {
        println!("event: {}", event.to_value());
        Ok(())
    };

    let coordinator = CallCoordinatorBuilder::new()
        .with_driver(driver.clone())
        .with_config(
            CallNotifyConfig::new("incoming_calls", "Incoming calls", "com.example.app/.CallActivity")
                .with_action_labels("Answer", "Reject")
                .with_ring_timeout(Duration::from_secs(3)),
        )
        .with_listener(Arc::new(printer))
        .build()?;

    // Remote signaling backend reports the call was answered on another device
    coordinator.handle_inbound_message(&push_data("room-1", "Alice"));
    let bridge = MethodBridge::new(coordinator.clone());
    bridge
        .handle("updateStatus", &json!({ "roomId": "room-1", "status": "answered" }))?;

    // Nobody picks up the second call
    let mut events = coordinator.events();
    coordinator.handle_inbound_message(&push_data("room-2", "Bob"));
    loop {
        let event = events.recv().await?;
        if event.status == CallState::Timeout {
            break;
        }
    }

    println!(
        "presentations started: {}, launches: {}",
        driver.start_count(),
        driver.launches().len()
    );
    for record in coordinator.recent_transitions() {
        println!("{:?} {} {:?} -> {:?}", record.reason, record.room_id, record.from, record.to);
    }

    Ok(())
}
