// Call notification components: payload, status, configuration, lifecycle
// and the presentation contract shared by the coordinator and its drivers

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod config;
pub mod driver;
pub mod lifecycle;
pub mod payload;
pub mod status;
pub mod timer;

pub use config::{
    CallNotifyConfig, DEFAULT_ACCEPT_LABEL, DEFAULT_DECLINE_LABEL, DEFAULT_RING_TIMEOUT,
    LaunchTarget,
};
pub use driver::{LaunchExtras, PresentationDriver, PresentationRequest};
pub use lifecycle::{ActiveCall, HISTORY_LIMIT, TransitionHistory, TransitionReason, TransitionRecord};
pub use payload::{CALL_AUDIO, CALL_VIDEO, CallKind, CallPayload, is_call_message_type};
pub use status::{CallEvent, CallState, StatusUpdate, parse_status};
pub use timer::RingTimer;

/// Identifier returned by `CallCoordinator::subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised by the call notification coordinator and its collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallNotifyError {
    /// Required configuration field missing or empty
    #[error("Invalid config field {field}: {message}")]
    InvalidConfig { field: String, message: String },

    /// Inbound call message missing a required field
    #[error("Missing required key: {field}")]
    InvalidPayload { field: String },

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Invalid launch target: {0}")]
    InvalidLaunchTarget(String),

    /// Ring timeout requested without a tokio runtime to schedule it on
    #[error("No tokio runtime available for ring timeout")]
    NoRuntime,

    #[error("Presentation driver failed during {operation}: {message}")]
    Driver { operation: String, message: String },

    #[error("Event listener error: {0}")]
    Listener(String),

    /// State-changing operation invoked from inside an event listener
    #[error("{0} called from an event listener while the coordinator is emitting")]
    ReentrantCall(String),
}

impl CallNotifyError {
    pub fn driver(operation: impl Into<String>, message: impl Into<String>) -> Self {
        CallNotifyError::Driver {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

pub type CallNotifyResult<T> = Result<T, CallNotifyError>;
