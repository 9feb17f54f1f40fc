//! Tests for backends/headless.rs

use std::collections::HashMap;

use kodegen_call_notify::*;

fn payload() -> CallPayload {
    let fields: HashMap<String, String> = [
        ("type", "call_video"),
        ("roomId", "r1"),
        ("callerId", "u1"),
        ("callerName", "Bob"),
        ("receiverId", "u2"),
        ("avatarUrl", "https://cdn.example.com/bob.png"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    CallPayload::from_fields(&fields).unwrap()
}

#[test]
fn test_ensure_channel_is_idempotent() {
    let driver = HeadlessDriver::new();
    let config = CallNotifyConfig::new("c1", "Calls", "app.Incoming").with_ringtone("ring");

    driver.ensure_channel(&config).unwrap();
    let created = driver.channel("c1").unwrap();
    driver
        .ensure_channel(&CallNotifyConfig::new("c1", "Renamed", "app.Incoming"))
        .unwrap();

    assert_eq!(driver.channel_count(), 1);
    let channel = driver.channel("c1").unwrap();
    assert_eq!(channel, created);
    assert_eq!(channel.name, "Calls");
    assert_eq!(channel.ringtone.as_deref(), Some("ring"));
}

#[test]
fn test_presentation_lifecycle() {
    let driver = HeadlessDriver::new();
    let config = CallNotifyConfig::new("c1", "Calls", "app.Incoming")
        .with_action_labels("Answer", "Reject")
        .with_icon("ic_call");
    let request = PresentationRequest::new(&config, &payload());

    assert_eq!(request.title, "Bob");
    assert_eq!(request.body, "Incoming video call");
    assert_eq!(request.kind, CallKind::Video);
    assert_eq!(request.accept_label, "Answer");
    assert_eq!(request.decline_label, "Reject");
    assert_eq!(request.icon.as_deref(), Some("ic_call"));
    assert_eq!(
        request.avatar.as_ref().map(|url| url.host_str()),
        Some(Some("cdn.example.com"))
    );
    assert_eq!(request.ring_timeout, Some(DEFAULT_RING_TIMEOUT));

    driver.start_presenting(&request).unwrap();
    assert_eq!(driver.current_presentation(), Some(request));

    driver.stop_presenting().unwrap();
    driver.stop_presenting().unwrap();
    assert!(driver.current_presentation().is_none());
    assert_eq!(driver.start_count(), 1);
    assert_eq!(driver.stop_count(), 2);
}

#[test]
fn test_invalid_avatar_is_dropped() {
    let mut payload = payload();
    payload.avatar_url = Some("not a url".to_string());
    let config = CallNotifyConfig::new("c1", "Calls", "app.Incoming");

    let request = PresentationRequest::new(&config, &payload);
    assert!(request.avatar.is_none());
    assert_eq!(request.payload.avatar_url.as_deref(), Some("not a url"));
}

#[test]
fn test_launch_records_extras() {
    let driver = HeadlessDriver::new();
    let target = LaunchTarget::parse("com.example/.CallActivity").unwrap();
    let extras = LaunchExtras::from(&payload());

    driver.launch(&target, &extras).unwrap();

    let launches = driver.launches();
    assert_eq!(launches.len(), 1);
    assert_eq!(launches[0].target.class_name(), "com.example.CallActivity");
    assert_eq!(launches[0].extras.caller_name, "Bob");
    assert_eq!(launches[0].extras.call_type, "call_video");
    assert_eq!(launches[0].extras.payload, payload());
}
