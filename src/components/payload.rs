// Incoming call payload parsed from push message data

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{CallNotifyError, CallNotifyResult};

/// Message `type` values that start an incoming call
pub const CALL_AUDIO: &str = "call_audio";
pub const CALL_VIDEO: &str = "call_video";

/// Check if a message `type` field announces an incoming call
pub fn is_call_message_type(value: &str) -> bool {
    value == CALL_AUDIO || value == CALL_VIDEO
}

/// Immutable snapshot of the call being presented.
///
/// `room_id` and `caller_id` are never empty; `call_id` falls back to
/// `room_id` when the sender did not provide one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallPayload {
    pub call_id: String,
    pub room_id: String,
    pub caller_id: String,
    pub caller_name: String,
    pub receiver_id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub avatar_url: Option<String>,
    pub media_type: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl CallPayload {
    /// Parse a flat push data map.
    ///
    /// Fails with [`CallNotifyError::InvalidPayload`] naming the first missing
    /// or empty required key. A malformed `metadata` string degrades to an
    /// empty map.
    pub fn from_fields(data: &HashMap<String, String>) -> CallNotifyResult<Self> {
        let room_id = require(data, "roomId")?;
        let caller_id = require(data, "callerId")?;
        let caller_name = require(data, "callerName")?;
        let receiver_id = require(data, "receiverId")?;
        let call_type = require(data, "type")?;

        let call_id = data
            .get("callId")
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| room_id.clone());

        let metadata = data
            .get("metadata")
            .map(|raw| parse_metadata(raw))
            .unwrap_or_default();

        Ok(Self {
            call_id,
            room_id,
            caller_id,
            caller_name,
            receiver_id,
            call_type,
            avatar_url: data.get("avatarUrl").cloned(),
            media_type: data.get("mediaType").cloned(),
            metadata,
        })
    }

    /// Flat map form accepted by [`CallPayload::from_fields`]
    pub fn to_fields(&self) -> HashMap<String, String> {
        let mut fields = HashMap::new();
        fields.insert("callId".to_string(), self.call_id.clone());
        fields.insert("roomId".to_string(), self.room_id.clone());
        fields.insert("callerId".to_string(), self.caller_id.clone());
        fields.insert("callerName".to_string(), self.caller_name.clone());
        fields.insert("receiverId".to_string(), self.receiver_id.clone());
        fields.insert("type".to_string(), self.call_type.clone());
        if let Some(avatar_url) = &self.avatar_url {
            fields.insert("avatarUrl".to_string(), avatar_url.clone());
        }
        if let Some(media_type) = &self.media_type {
            fields.insert("mediaType".to_string(), media_type.clone());
        }
        fields.insert(
            "metadata".to_string(),
            Value::Object(self.metadata.clone()).to_string(),
        );
        fields
    }

    /// Key-value structure used for events crossing the plugin channel
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("callId".to_string(), Value::from(self.call_id.as_str()));
        map.insert("roomId".to_string(), Value::from(self.room_id.as_str()));
        map.insert("callerId".to_string(), Value::from(self.caller_id.as_str()));
        map.insert(
            "callerName".to_string(),
            Value::from(self.caller_name.as_str()),
        );
        map.insert(
            "receiverId".to_string(),
            Value::from(self.receiver_id.as_str()),
        );
        map.insert("type".to_string(), Value::from(self.call_type.as_str()));
        map.insert(
            "avatarUrl".to_string(),
            self.avatar_url.clone().map(Value::from).unwrap_or(Value::Null),
        );
        map.insert(
            "mediaType".to_string(),
            self.media_type.clone().map(Value::from).unwrap_or(Value::Null),
        );
        map.insert("metadata".to_string(), Value::Object(self.metadata.clone()));
        Value::Object(map)
    }

    /// Inverse of [`CallPayload::to_value`]; `metadata` may be an object or
    /// a JSON-encoded string
    pub fn from_value(value: &Value) -> CallNotifyResult<Self> {
        let object = value.as_object().ok_or(CallNotifyError::InvalidPayload {
            field: "payload".to_string(),
        })?;

        let fields: HashMap<String, String> = object
            .iter()
            .filter(|(k, _)| k.as_str() != "metadata")
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect();

        let mut payload = Self::from_fields(&fields)?;
        payload.metadata = match object.get("metadata") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::String(raw)) => parse_metadata(raw),
            _ => Map::new(),
        };
        Ok(payload)
    }

    /// Presentation kind, `media_type` taking precedence over `type`
    pub fn kind(&self) -> CallKind {
        let hint = self.media_type.as_deref().unwrap_or(&self.call_type);
        match hint {
            "call_video" | "video" => CallKind::Video,
            _ => CallKind::Audio,
        }
    }
}

/// Media kind the incoming call UI should advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    Audio,
    Video,
}

fn require(data: &HashMap<String, String>, key: &str) -> CallNotifyResult<String> {
    data.get(key)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| CallNotifyError::InvalidPayload {
            field: key.to_string(),
        })
}

fn parse_metadata(raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::debug!(value = %other, "Call metadata is not a JSON object, ignoring");
            Map::new()
        },
        Err(e) => {
            tracing::debug!("Failed to parse call metadata: {}", e);
            Map::new()
        },
    }
}
