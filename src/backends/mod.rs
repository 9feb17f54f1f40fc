// Presentation driver backends
// Native platform drivers live in the embedding application; this crate ships
// the in-memory headless driver

pub mod headless;

use std::sync::Arc;

pub use headless::{ChannelSpec, HeadlessDriver, LaunchRecord};

use crate::components::PresentationDriver;

/// Factory for the drivers bundled with the crate
pub struct PresentationBackendFactory;

impl PresentationBackendFactory {
    /// Driver that keeps presentation state in memory and logs it
    pub fn headless() -> Arc<HeadlessDriver> {
        Arc::new(HeadlessDriver::new())
    }

    /// Default driver for embedders that do not provide a native one
    pub fn create_default() -> Arc<dyn PresentationDriver> {
        Self::headless()
    }
}
