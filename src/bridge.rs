// Method bridge for forwarding plugin channel calls to the coordinator
// Wire format is JSON: `{method, arguments}` in, `Value` or `{code, message}` out

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::components::{CallEvent, CallNotifyConfig, CallNotifyError};
use crate::coordinator::CallCoordinator;

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_HANDLE_REMOTE_MESSAGE: &str = "handleRemoteMessage";
pub const METHOD_UPDATE_STATUS: &str = "updateStatus";

/// Error code and message reported back over the plugin channel
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct BridgeError {
    pub code: BridgeErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeErrorCode {
    InvalidArgument,
    InvalidConfig,
    InvalidStatus,
    NotImplemented,
}

impl std::fmt::Display for BridgeErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            BridgeErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            BridgeErrorCode::InvalidConfig => "INVALID_CONFIG",
            BridgeErrorCode::InvalidStatus => "INVALID_STATUS",
            BridgeErrorCode::NotImplemented => "NOT_IMPLEMENTED",
        };
        f.write_str(code)
    }
}

impl BridgeError {
    pub fn new(code: BridgeErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<CallNotifyError> for BridgeError {
    fn from(error: CallNotifyError) -> Self {
        let code = match &error {
            CallNotifyError::InvalidConfig { .. } => BridgeErrorCode::InvalidConfig,
            CallNotifyError::UnknownStatus(_) => BridgeErrorCode::InvalidStatus,
            _ => BridgeErrorCode::InvalidArgument,
        };
        Self::new(code, error.to_string())
    }
}

pub type BridgeResult = Result<Value, BridgeError>;

/// Dispatches plugin method calls onto a [`CallCoordinator`]
#[derive(Debug, Clone)]
pub struct MethodBridge {
    coordinator: CallCoordinator,
}

impl MethodBridge {
    pub fn new(coordinator: CallCoordinator) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &CallCoordinator {
        &self.coordinator
    }

    /// Event stream for the plugin's event channel; use
    /// [`CallEvent::to_value`] for the wire form
    pub fn event_stream(&self) -> broadcast::Receiver<CallEvent> {
        self.coordinator.events()
    }

    pub fn handle(&self, method: &str, arguments: &Value) -> BridgeResult {
        match method {
            METHOD_INITIALIZE => self.initialize(arguments),
            METHOD_HANDLE_REMOTE_MESSAGE => self.handle_remote_message(arguments),
            METHOD_UPDATE_STATUS => self.update_status(arguments),
            other => {
                tracing::debug!(method = other, "Method not implemented");
                Err(BridgeError::new(
                    BridgeErrorCode::NotImplemented,
                    format!("Method not implemented: {}", other),
                ))
            },
        }
    }

    fn initialize(&self, arguments: &Value) -> BridgeResult {
        let map = arguments.as_object().ok_or_else(|| {
            BridgeError::new(BridgeErrorCode::InvalidArgument, "Config payload is missing")
        })?;

        let config = CallNotifyConfig::from_map(map).inspect_err(|e| {
            tracing::error!("Failed to parse config: {}", e);
        })?;
        self.coordinator.configure(config)?;
        Ok(Value::Null)
    }

    fn handle_remote_message(&self, arguments: &Value) -> BridgeResult {
        let map = arguments.as_object().ok_or_else(|| {
            BridgeError::new(
                BridgeErrorCode::InvalidArgument,
                "Remote message data is missing",
            )
        })?;

        let fields: HashMap<String, String> = map
            .iter()
            .filter_map(|(key, value)| value.as_str().map(|s| (key.clone(), s.to_string())))
            .collect();

        let outcome = self.coordinator.handle_inbound_message(&fields);
        tracing::debug!(?outcome, "Remote message handled");
        Ok(Value::Null)
    }

    fn update_status(&self, arguments: &Value) -> BridgeResult {
        let map = arguments.as_object().ok_or_else(|| {
            BridgeError::new(BridgeErrorCode::InvalidArgument, "Arguments are missing")
        })?;

        let room_id = map.get("roomId").and_then(Value::as_str).unwrap_or_default();
        let status = map.get("status").and_then(Value::as_str).unwrap_or_default();
        if room_id.is_empty() || status.is_empty() {
            return Err(BridgeError::new(
                BridgeErrorCode::InvalidArgument,
                "roomId or status missing",
            ));
        }

        self.coordinator.update_status_str(room_id, status)?;
        Ok(Value::Null)
    }
}
