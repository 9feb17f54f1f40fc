// Call lifecycle coordinator
//
// Owns the single active call slot, applies status transitions, fans lifecycle
// events out to listeners and drives the presentation side effects. Every
// state-changing operation takes the same state lock for its whole
// check -> act -> update -> emit sequence.

use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::components::{
    ActiveCall, CallEvent, CallNotifyConfig, CallNotifyError, CallNotifyResult, CallPayload,
    CallState, LaunchExtras, PresentationDriver, PresentationRequest, RingTimer, StatusUpdate,
    SubscriptionId, TransitionHistory, TransitionReason, TransitionRecord,
    is_call_message_type,
};

/// Capacity of the broadcast event stream returned by [`CallCoordinator::events`]
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Receives every [`CallEvent`] the coordinator emits.
///
/// Listeners run while the coordinator holds its state lock. From inside a
/// listener, read accessors see the state as of the event being delivered,
/// subscriptions can be changed, and state-changing operations are rejected
/// with [`CallNotifyError::ReentrantCall`]. Errors and panics are logged and
/// never reach other listeners or the triggering operation.
pub trait CallEventListener: Send + Sync {
    fn on_event(&self, event: &CallEvent) -> CallNotifyResult<()>;
}

impl<F> CallEventListener for F
where
    F: Fn(&CallEvent) -> CallNotifyResult<()> + Send + Sync,
{
    fn on_event(&self, event: &CallEvent) -> CallNotifyResult<()> {
        self(event)
    }
}

/// Outcome of [`CallCoordinator::handle_inbound_message`].
///
/// Ingestion is best effort: none of these is an error for the message source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingest {
    /// New call is ringing
    Ringing,
    /// Message `type` is not an incoming call
    Ignored,
    /// Coordinator has not been configured yet
    NotConfigured,
    /// Message announced a call but could not be parsed
    Dropped(CallNotifyError),
}

struct CoordinatorState {
    config: Option<CallNotifyConfig>,
    active: Option<ActiveCall>,
    next_generation: u64,
    timer: RingTimer,
    history: TransitionHistory,
}

struct Shared {
    driver: Arc<dyn PresentationDriver>,
    runtime: Option<Handle>,
    events: broadcast::Sender<CallEvent>,
    listeners: Mutex<Vec<(SubscriptionId, Arc<dyn CallEventListener>)>>,
    state: Mutex<CoordinatorState>,
}

/// State visible to listeners of one coordinator while it is emitting
struct DispatchView {
    coordinator: usize,
    config: Option<CallNotifyConfig>,
    active: Option<ActiveCall>,
    history: Vec<TransitionRecord>,
}

thread_local! {
    static DISPATCHING: RefCell<Vec<DispatchView>> = const { RefCell::new(Vec::new()) };
}

/// Pops the dispatch view pushed for the current emit
struct DispatchGuard;

impl DispatchGuard {
    fn enter(view: DispatchView) -> Self {
        DISPATCHING.with(|stack| stack.borrow_mut().push(view));
        DispatchGuard
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        DISPATCHING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Handle to the call lifecycle coordinator.
///
/// Cheap to clone; all clones share one active call slot.
#[derive(Clone)]
pub struct CallCoordinator {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for CallCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("CallCoordinator");
        match self.shared.state.try_lock() {
            Some(state) => debug
                .field("configured", &state.config.is_some())
                .field("active", &state.active),
            None => debug.field("state", &"<locked>"),
        };
        debug
            .field("listeners", &self.shared.listeners.lock().len())
            .finish()
    }
}

impl CallCoordinator {
    /// Create a coordinator using the tokio runtime of the calling context, if
    /// any, for ring timeouts
    pub fn new(driver: Arc<dyn PresentationDriver>) -> Self {
        Self::with_runtime(driver, Handle::try_current().ok())
    }

    pub fn with_runtime(driver: Arc<dyn PresentationDriver>, runtime: Option<Handle>) -> Self {
        Self::with_options(driver, runtime, DEFAULT_EVENT_CAPACITY)
    }

    pub(crate) fn with_options(
        driver: Arc<dyn PresentationDriver>,
        runtime: Option<Handle>,
        event_capacity: usize,
    ) -> Self {
        if runtime.is_none() {
            tracing::warn!("CallCoordinator created without a tokio runtime; ring timeouts are disabled");
        }

        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                driver,
                runtime: runtime.clone(),
                events,
                listeners: Mutex::new(Vec::new()),
                state: Mutex::new(CoordinatorState {
                    config: None,
                    active: None,
                    next_generation: 0,
                    timer: RingTimer::new(runtime),
                    history: TransitionHistory::new(),
                }),
            }),
        }
    }

    /// Store the configuration and make sure the notification channel exists
    pub fn configure(&self, config: CallNotifyConfig) -> CallNotifyResult<()> {
        config.validate()?;

        let mut state = self.lock_state("configure")?;
        if let Err(e) = self.shared.driver.ensure_channel(&config) {
            tracing::warn!(channel_id = %config.channel_id, "Failed to ensure notification channel: {}", e);
        }
        tracing::info!(
            channel_id = %config.channel_id,
            full_screen_target = %config.full_screen_target,
            status_listener = config.enable_status_listener,
            "Call notifications configured"
        );
        state.config = Some(config);
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.dispatch_view(|view| view.config.is_some())
            .unwrap_or_else(|| self.shared.state.lock().config.is_some())
    }

    pub fn config(&self) -> Option<CallNotifyConfig> {
        self.dispatch_view(|view| view.config.clone())
            .unwrap_or_else(|| self.shared.state.lock().config.clone())
    }

    /// Register a listener; takes effect from the next emitted event
    pub fn subscribe(&self, listener: Arc<dyn CallEventListener>) -> SubscriptionId {
        let id = SubscriptionId::generate();
        self.shared.listeners.lock().push((id, listener));
        tracing::debug!(subscription = %id, "Call event listener registered");
        id
    }

    /// Remove a listener; returns false if `id` was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.shared.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        before != listeners.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.listeners.lock().len()
    }

    /// Channel-based event stream; slow receivers lose the oldest events
    pub fn events(&self) -> broadcast::Receiver<CallEvent> {
        self.shared.events.subscribe()
    }

    /// Snapshot of the active call, if any
    pub fn current_call(&self) -> Option<ActiveCall> {
        self.dispatch_view(|view| view.active.clone())
            .unwrap_or_else(|| self.shared.state.lock().active.clone())
    }

    pub fn recent_transitions(&self) -> Vec<TransitionRecord> {
        self.dispatch_view(|view| view.history.clone())
            .unwrap_or_else(|| self.shared.state.lock().history.snapshot())
    }

    /// Entry point for push data announcing an incoming call
    pub fn handle_inbound_message(&self, fields: &HashMap<String, String>) -> Ingest {
        let Some(call_type) = fields.get("type") else {
            tracing::debug!("Ignoring message without type");
            return Ingest::Ignored;
        };
        if !is_call_message_type(call_type) {
            tracing::debug!(message_type = %call_type, "Ignoring message type");
            return Ingest::Ignored;
        }

        let mut state = match self.lock_state("handle_inbound_message") {
            Ok(state) => state,
            Err(e) => return Ingest::Dropped(e),
        };
        let Some(config) = state.config.clone() else {
            tracing::warn!("Inbound call message received before configuration");
            return Ingest::NotConfigured;
        };

        let payload = match CallPayload::from_fields(fields) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to parse call payload: {}", e);
                return Ingest::Dropped(e);
            },
        };

        self.teardown_locked(&mut state);

        state.next_generation += 1;
        let generation = state.next_generation;
        state.active = Some(ActiveCall::ringing(payload.clone(), generation));
        state.history.record(
            &payload,
            None,
            Some(CallState::Ringing),
            TransitionReason::InboundMessage,
        );
        tracing::info!(
            room_id = %payload.room_id,
            call_id = %payload.call_id,
            generation,
            "Incoming call ringing"
        );

        self.emit_locked(&state, CallEvent::new(CallState::Ringing, payload.clone()));

        let request = PresentationRequest::new(&config, &payload);
        if let Err(e) = self.shared.driver.start_presenting(&request) {
            tracing::warn!(room_id = %payload.room_id, "Failed to start call presentation: {}", e);
        }

        if let Some(timeout) = config.effective_ring_timeout() {
            let weak = Arc::downgrade(&self.shared);
            let armed = state.timer.arm(generation, timeout, move || {
                fire_ring_timeout(&weak, generation);
            });
            if let Err(e) = armed {
                tracing::warn!(room_id = %payload.room_id, "Ring timeout not scheduled: {}", e);
            }
        }

        Ingest::Ringing
    }

    /// Apply a status reported by the signaling backend for `room_id`
    pub fn update_status(&self, room_id: &str, status: CallState) -> bool {
        let Ok(mut state) = self.lock_state("update_status") else {
            return false;
        };
        match &state.active {
            Some(active) if active.room_id() == room_id => {},
            _ => {
                tracing::debug!(room_id, %status, "updateStatus ignored for roomId");
                return false;
            },
        }

        let reason = TransitionReason::RemoteStatus;
        match status {
            CallState::Cancelled => self
                .finish_locked(&mut state, CallState::Cancelled, reason)
                .is_some(),
            CallState::Timeout | CallState::Missed => self
                .finish_locked(&mut state, CallState::Timeout, reason)
                .is_some(),
            CallState::Answered => self.accept_locked(&mut state, reason),
            CallState::Declined => self
                .finish_locked(&mut state, CallState::Declined, reason)
                .is_some(),
            other => {
                tracing::debug!(room_id, status = %other, "updateStatus no-op for status");
                false
            },
        }
    }

    /// Parse a status name and apply it; unknown names are logged and rejected
    pub fn update_status_str(&self, room_id: &str, status: &str) -> CallNotifyResult<bool> {
        match status.parse::<CallState>() {
            Ok(status) => Ok(self.update_status(room_id, status)),
            Err(e) => {
                tracing::warn!(room_id, "{}", e);
                Err(e)
            },
        }
    }

    pub fn on_accepted(&self) -> bool {
        let Ok(mut state) = self.lock_state("on_accepted") else {
            return false;
        };
        self.accept_locked(&mut state, TransitionReason::UserAccepted)
    }

    pub fn on_declined(&self) -> bool {
        let Ok(mut state) = self.lock_state("on_declined") else {
            return false;
        };
        self.finish_locked(&mut state, CallState::Declined, TransitionReason::UserDeclined)
            .is_some()
    }

    pub fn on_timeout(&self) -> bool {
        let Ok(mut state) = self.lock_state("on_timeout") else {
            return false;
        };
        self.finish_locked(&mut state, CallState::Timeout, TransitionReason::RingTimeout)
            .is_some()
    }

    pub fn on_caller_cancelled(&self) -> bool {
        let Ok(mut state) = self.lock_state("on_caller_cancelled") else {
            return false;
        };
        self.finish_locked(
            &mut state,
            CallState::Cancelled,
            TransitionReason::CallerCancelled,
        )
        .is_some()
    }

    /// Ring timer callback; ignored unless `generation` is still ringing
    pub fn on_ring_timeout(&self, generation: u64) -> bool {
        let Ok(mut state) = self.lock_state("on_ring_timeout") else {
            return false;
        };
        state.timer.disarm(generation);

        match &state.active {
            Some(active) if active.generation == generation && active.state == CallState::Ringing => {},
            _ => {
                tracing::debug!(generation, "Stale ring timeout ignored");
                return false;
            },
        }

        self.finish_locked(&mut state, CallState::Timeout, TransitionReason::RingTimeout)
            .is_some()
    }

    /// Forward status updates from a signaling backend.
    ///
    /// Only runs when the configuration enables the status listener and a
    /// runtime is available; otherwise the feed is dropped.
    pub fn attach_status_feed(
        &self,
        mut feed: mpsc::Receiver<StatusUpdate>,
    ) -> Option<JoinHandle<()>> {
        let enabled = self
            .config()
            .is_some_and(|config| config.enable_status_listener);
        if !enabled {
            tracing::info!("Status listener disabled, dropping status feed");
            return None;
        }

        let Some(runtime) = self.shared.runtime.as_ref() else {
            tracing::warn!("No tokio runtime available for status feed");
            return None;
        };

        let weak = Arc::downgrade(&self.shared);
        Some(runtime.spawn(async move {
            while let Some(update) = feed.recv().await {
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                CallCoordinator { shared }.update_status(&update.room_id, update.status);
            }
            tracing::debug!("Status feed closed");
        }))
    }

    fn accept_locked(&self, state: &mut CoordinatorState, reason: TransitionReason) -> bool {
        let Some(payload) = self.finish_locked(state, CallState::Answered, reason) else {
            return false;
        };

        if let Some(config) = &state.config {
            match config.launch_target() {
                Ok(target) => {
                    let extras = LaunchExtras::from(&payload);
                    if let Err(e) = self.shared.driver.launch(&target, &extras) {
                        tracing::warn!(launch_target = %target, "Failed to launch accepted call destination: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Skipping accepted call launch: {}", e);
                },
            }
        }
        true
    }

    /// Apply a terminal transition to the active call.
    ///
    /// Returns the finished call's payload, or `None` when nothing was active.
    fn finish_locked(
        &self,
        state: &mut CoordinatorState,
        target: CallState,
        reason: TransitionReason,
    ) -> Option<CallPayload> {
        let current = state.active.as_ref()?.state;
        if !CallState::can_transition_to(Some(current), target) {
            tracing::debug!(from = %current, to = %target, "Transition rejected");
            return None;
        }

        let active = state.active.take()?;
        state.timer.cancel();
        if let Err(e) = self.shared.driver.stop_presenting() {
            tracing::warn!(room_id = %active.room_id(), "Failed to stop call presentation: {}", e);
        }

        state
            .history
            .record(&active.payload, Some(active.state), Some(target), reason);
        tracing::info!(
            room_id = %active.room_id(),
            call_id = %active.payload.call_id,
            status = %target,
            ?reason,
            "Call finished"
        );

        self.emit_locked(state, CallEvent::new(target, active.payload.clone()));
        Some(active.payload)
    }

    /// Drop the active call without emitting an event; idempotent
    fn teardown_locked(&self, state: &mut CoordinatorState) {
        state.timer.cancel();

        let Some(previous) = state.active.take() else {
            return;
        };
        tracing::info!(
            room_id = %previous.room_id(),
            call_id = %previous.payload.call_id,
            "Superseding active call"
        );
        if let Err(e) = self.shared.driver.stop_presenting() {
            tracing::warn!(room_id = %previous.room_id(), "Failed to stop call presentation: {}", e);
        }
        state.history.record(
            &previous.payload,
            Some(previous.state),
            None,
            TransitionReason::Superseded,
        );
    }

    fn emit_locked(&self, state: &CoordinatorState, event: CallEvent) {
        let listeners = self.shared.listeners.lock().clone();
        if !listeners.is_empty() {
            let _dispatch = DispatchGuard::enter(DispatchView {
                coordinator: self.dispatch_key(),
                config: state.config.clone(),
                active: state.active.clone(),
                history: state.history.snapshot(),
            });
            for (id, listener) in &listeners {
                match catch_unwind(AssertUnwindSafe(|| listener.on_event(&event))) {
                    Ok(Ok(())) => {},
                    Ok(Err(e)) => {
                        tracing::error!(subscription = %id, status = %event.status, "Event listener error: {}", e);
                    },
                    Err(_) => {
                        tracing::error!(subscription = %id, status = %event.status, "Event listener panicked");
                    },
                }
            }
        }

        // No receivers is not an error
        let _ = self.shared.events.send(event);
    }
}

impl CallCoordinator {
    fn dispatch_key(&self) -> usize {
        Arc::as_ptr(&self.shared) as usize
    }

    /// Read from the state snapshot if this thread is inside one of our listeners
    fn dispatch_view<R>(&self, read: impl FnOnce(&DispatchView) -> R) -> Option<R> {
        let key = self.dispatch_key();
        DISPATCHING.with(|stack| {
            stack
                .borrow()
                .iter()
                .rev()
                .find(|view| view.coordinator == key)
                .map(read)
        })
    }

    /// Take the state lock, refusing when this thread already holds it for an emit
    fn lock_state(&self, operation: &str) -> CallNotifyResult<MutexGuard<'_, CoordinatorState>> {
        if self.dispatch_view(|_| ()).is_some() {
            tracing::error!(operation, "Coordinator operation called from an event listener; use events() instead");
            return Err(CallNotifyError::ReentrantCall(operation.to_string()));
        }
        Ok(self.shared.state.lock())
    }
}

fn fire_ring_timeout(shared: &Weak<Shared>, generation: u64) {
    if let Some(shared) = shared.upgrade() {
        CallCoordinator { shared }.on_ring_timeout(generation);
    }
}
