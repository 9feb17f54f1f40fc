//! Incoming call notification lifecycle for native call UI bridges
//!
//! This crate coordinates the single incoming call an application presents
//! through native notification surfaces: a push message starts the call
//! ringing, and user actions, remote status updates, the caller hanging up or
//! the ring timeout end it. Platform work (notification channels, call
//! notifications, full-screen UI, launching the app) is delegated to a
//! [`PresentationDriver`] supplied by the host.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use kodegen_call_notify::{CallCoordinatorBuilder, CallNotifyConfig, PresentationBackendFactory};
//!
//! let coordinator = CallCoordinatorBuilder::new()
//!     .with_driver(PresentationBackendFactory::create_default())
//!     .with_config(CallNotifyConfig::new("calls", "Calls", "app.IncomingCallActivity"))
//!     .build()?;
//!
//! let message = HashMap::from([
//!     ("type".to_string(), "call_audio".to_string()),
//!     ("roomId".to_string(), "r1".to_string()),
//!     ("callerId".to_string(), "u1".to_string()),
//!     ("callerName".to_string(), "Alice".to_string()),
//!     ("receiverId".to_string(), "u2".to_string()),
//! ]);
//! coordinator.handle_inbound_message(&message);
//! coordinator.on_accepted();
//! # Ok::<(), kodegen_call_notify::CallNotifyError>(())
//! ```

use std::sync::Arc;

use tokio::runtime::Handle;

pub mod backends;
pub mod bridge;
pub mod components;
pub mod coordinator;

// Re-export all components for convenience
pub use backends::*;
pub use bridge::{BridgeError, BridgeErrorCode, BridgeResult, MethodBridge};
pub use components::*;
pub use coordinator::{CallCoordinator, CallEventListener, DEFAULT_EVENT_CAPACITY, Ingest};

/// Builder for wiring a coordinator with its driver, configuration and listeners
pub struct CallCoordinatorBuilder {
    driver: Option<Arc<dyn PresentationDriver>>,
    config: Option<CallNotifyConfig>,
    runtime: Option<Handle>,
    listeners: Vec<Arc<dyn CallEventListener>>,
    event_capacity: usize,
}

impl CallCoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            driver: None,
            config: None,
            runtime: None,
            listeners: Vec::new(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn with_driver(mut self, driver: Arc<dyn PresentationDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn with_config(mut self, config: CallNotifyConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Runtime used for ring timeouts; defaults to the current one
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn CallEventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Build the coordinator, applying the configuration if one was given
    pub fn build(self) -> CallNotifyResult<CallCoordinator> {
        let driver = self
            .driver
            .unwrap_or_else(PresentationBackendFactory::create_default);
        let runtime = self.runtime.or_else(|| Handle::try_current().ok());

        let coordinator = CallCoordinator::with_options(driver, runtime, self.event_capacity);
        for listener in self.listeners {
            coordinator.subscribe(listener);
        }
        if let Some(config) = self.config {
            coordinator.configure(config)?;
        }
        Ok(coordinator)
    }
}

impl Default for CallCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
