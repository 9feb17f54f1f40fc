// Call status model and lifecycle events delivered to subscribers

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::payload::CallPayload;
use super::{CallNotifyError, CallNotifyResult};

/// Status of the call currently presented to the user.
///
/// Wire names are lower-case (`"ringing"`, `"answered"`, ...) so the values can
/// cross a plugin channel unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    /// Incoming call is being presented and waiting for the user
    Ringing,
    /// User picked up and the application is connecting
    Answering,
    /// Call was answered, here or on another device
    Answered,
    /// Call was declined by the receiver
    Declined,
    /// Caller hung up before the call was answered
    Cancelled,
    /// Ring timeout elapsed without an answer
    Timeout,
    /// Remote backend reported the call as missed
    Missed,
}

impl CallState {
    pub const ALL: [CallState; 7] = [
        CallState::Ringing,
        CallState::Answering,
        CallState::Answered,
        CallState::Declined,
        CallState::Cancelled,
        CallState::Timeout,
        CallState::Missed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Ringing => "ringing",
            CallState::Answering => "answering",
            CallState::Answered => "answered",
            CallState::Declined => "declined",
            CallState::Cancelled => "cancelled",
            CallState::Timeout => "timeout",
            CallState::Missed => "missed",
        }
    }

    /// Terminal states end the call instance and clear the active slot
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallState::Answered
                | CallState::Declined
                | CallState::Cancelled
                | CallState::Timeout
                | CallState::Missed
        )
    }

    /// Check if a call in this state may move to `target`.
    ///
    /// `None` stands for "no active call": only `Ringing` is reachable from it.
    pub fn can_transition_to(from: Option<CallState>, target: CallState) -> bool {
        use CallState::*;

        match (from, target) {
            (None, Ringing) => true,
            (None, _) => false,

            (Some(Ringing), Answering) => true,
            (Some(Ringing), Answered) => true,
            (Some(Ringing), Declined) => true,
            (Some(Ringing), Cancelled) => true,
            (Some(Ringing), Timeout) => true,
            (Some(Ringing), Missed) => true,
            // A new inbound call replaces the ringing one
            (Some(Ringing), Ringing) => true,

            (Some(Answering), Answered) => true,
            (Some(Answering), Cancelled) => true,

            // Terminal states never leave
            _ => false,
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallState {
    type Err = CallNotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CallState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| CallNotifyError::UnknownStatus(s.to_string()))
    }
}

/// Parse an optional status name; empty and unknown names yield `None`
pub fn parse_status(value: Option<&str>) -> Option<CallState> {
    value
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
}

/// Lifecycle event emitted whenever the coordinator transitions a call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEvent {
    pub status: CallState,
    pub payload: CallPayload,
    pub occurred_at: DateTime<Utc>,
}

impl CallEvent {
    pub fn new(status: CallState, payload: CallPayload) -> Self {
        Self {
            status,
            payload,
            occurred_at: Utc::now(),
        }
    }

    /// Plain key-value representation forwarded across a plugin channel
    pub fn to_value(&self) -> Value {
        json!({
            "status": self.status.as_str(),
            "payload": self.payload.to_value(),
        })
    }

    /// Rebuild an event from its channel representation
    pub fn from_value(value: &Value) -> CallNotifyResult<Self> {
        let status = value
            .get("status")
            .and_then(Value::as_str)
            .ok_or(CallNotifyError::InvalidPayload {
                field: "status".to_string(),
            })?
            .parse()?;
        let payload = value.get("payload").ok_or(CallNotifyError::InvalidPayload {
            field: "payload".to_string(),
        })?;

        Ok(Self::new(status, CallPayload::from_value(payload)?))
    }
}

/// Status change pushed by a remote signaling backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub room_id: String,
    pub status: CallState,
}

impl StatusUpdate {
    pub fn new(room_id: impl Into<String>, status: CallState) -> Self {
        Self {
            room_id: room_id.into(),
            status,
        }
    }
}
