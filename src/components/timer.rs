// Single-shot ring timeout scheduled on the tokio runtime

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::{CallNotifyError, CallNotifyResult};

struct PendingTimeout {
    generation: u64,
    task: JoinHandle<()>,
}

/// Cancellable ring timeout.
///
/// At most one timeout is pending. Arming replaces (and aborts) the previous
/// one. The coordinator builds each callback around the call's generation and
/// re-checks it before acting, so a callback that already started when
/// `cancel` ran cannot time out a newer call.
pub struct RingTimer {
    runtime: Option<Handle>,
    pending: Option<PendingTimeout>,
}

impl RingTimer {
    pub fn new(runtime: Option<Handle>) -> Self {
        Self {
            runtime,
            pending: None,
        }
    }

    pub fn has_runtime(&self) -> bool {
        self.runtime.is_some()
    }

    /// Schedule `on_fire` after `delay`, cancelling any pending timeout
    pub fn arm<F>(&mut self, generation: u64, delay: Duration, on_fire: F) -> CallNotifyResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();

        let runtime = self.runtime.as_ref().ok_or(CallNotifyError::NoRuntime)?;
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire();
        });

        tracing::debug!(generation, delay_ms = delay.as_millis() as u64, "Ring timeout armed");
        self.pending = Some(PendingTimeout { generation, task });
        Ok(())
    }

    /// Abort the pending timeout; returns true if one was pending
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.task.abort();
                tracing::debug!(generation = pending.generation, "Ring timeout cancelled");
                true
            },
            None => false,
        }
    }

    /// Forget the pending timeout for `generation` without aborting it.
    ///
    /// Called from inside the firing task itself.
    pub fn disarm(&mut self, generation: u64) -> bool {
        if self.pending_generation() == Some(generation) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn pending_generation(&self) -> Option<u64> {
        self.pending.as_ref().map(|pending| pending.generation)
    }

    pub fn is_armed(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.task.is_finished())
    }
}

impl Drop for RingTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
