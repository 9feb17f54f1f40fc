//! Tests for components/payload.rs

use std::collections::HashMap;

use kodegen_call_notify::components::payload::*;
use kodegen_call_notify::CallNotifyError;
use serde_json::json;

fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn base() -> HashMap<String, String> {
    fields(&[
        ("type", "call_video"),
        ("roomId", "room-7"),
        ("callerId", "u1"),
        ("callerName", "Alice"),
        ("receiverId", "u2"),
    ])
}

#[test]
fn test_call_id_defaults_to_room_id() {
    let payload = CallPayload::from_fields(&base()).unwrap();
    assert_eq!(payload.call_id, "room-7");
    assert_eq!(payload.room_id, "room-7");
    assert_eq!(payload.call_type, "call_video");
    assert!(payload.avatar_url.is_none());
    assert!(payload.metadata.is_empty());

    let mut explicit = base();
    explicit.insert("callId".to_string(), "call-1".to_string());
    assert_eq!(CallPayload::from_fields(&explicit).unwrap().call_id, "call-1");
}

#[test]
fn test_required_fields() {
    for key in ["roomId", "callerId", "callerName", "receiverId", "type"] {
        let mut missing = base();
        missing.remove(key);
        assert_eq!(
            CallPayload::from_fields(&missing),
            Err(CallNotifyError::InvalidPayload {
                field: key.to_string()
            })
        );

        let mut empty = base();
        empty.insert(key.to_string(), String::new());
        assert!(CallPayload::from_fields(&empty).is_err());
    }
}

#[test]
fn test_metadata_parsing_degrades_to_empty() {
    let mut data = base();
    data.insert(
        "metadata".to_string(),
        r#"{"groupId":"g1","participants":3,"nested":{"hd":true}}"#.to_string(),
    );
    let payload = CallPayload::from_fields(&data).unwrap();
    assert_eq!(payload.metadata.get("groupId"), Some(&json!("g1")));
    assert_eq!(payload.metadata.get("participants"), Some(&json!(3)));
    assert_eq!(payload.metadata.get("nested"), Some(&json!({"hd": true})));

    for raw in ["{not json", "[1,2,3]", "\"text\"", ""] {
        data.insert("metadata".to_string(), raw.to_string());
        let payload = CallPayload::from_fields(&data).unwrap();
        assert!(payload.metadata.is_empty(), "metadata {:?}", raw);
    }
}

#[test]
fn test_field_map_round_trip() {
    let mut data = base();
    data.insert("callId".to_string(), "call-1".to_string());
    data.insert("avatarUrl".to_string(), "https://cdn.example.com/a.png".to_string());
    data.insert("mediaType".to_string(), "video".to_string());
    data.insert("metadata".to_string(), r#"{"k":[1,"two",null]}"#.to_string());

    let payload = CallPayload::from_fields(&data).unwrap();
    let rebuilt = CallPayload::from_fields(&payload.to_fields()).unwrap();
    assert_eq!(rebuilt, payload);

    let from_value = CallPayload::from_value(&payload.to_value()).unwrap();
    assert_eq!(from_value, payload);
}

#[test]
fn test_value_form_has_null_optionals() {
    let payload = CallPayload::from_fields(&base()).unwrap();
    let value = payload.to_value();
    assert_eq!(value["callId"], json!("room-7"));
    assert_eq!(value["type"], json!("call_video"));
    assert!(value["avatarUrl"].is_null());
    assert!(value["mediaType"].is_null());
    assert_eq!(value["metadata"], json!({}));
}

#[test]
fn test_kind_prefers_media_type() {
    let payload = CallPayload::from_fields(&base()).unwrap();
    assert_eq!(payload.kind(), CallKind::Video);

    let mut audio_override = base();
    audio_override.insert("mediaType".to_string(), "audio".to_string());
    assert_eq!(
        CallPayload::from_fields(&audio_override).unwrap().kind(),
        CallKind::Audio
    );

    assert!(is_call_message_type(CALL_AUDIO));
    assert!(is_call_message_type(CALL_VIDEO));
    assert!(!is_call_message_type("call"));
}
