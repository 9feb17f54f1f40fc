// Headless presentation driver - in-memory implementation
// Tracks channels, the presented call and launches; every effect is logged

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::components::{
    CallNotifyConfig, CallNotifyResult, LaunchExtras, LaunchTarget, PresentationDriver,
    PresentationRequest,
};

/// Notification channel registered through `ensure_channel`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub id: String,
    pub name: String,
    pub ringtone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Accepted-call destination opened through `launch`
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRecord {
    pub target: LaunchTarget,
    pub extras: LaunchExtras,
}

#[derive(Debug, Default)]
pub struct HeadlessDriver {
    channels: DashMap<String, ChannelSpec>,
    presentation: Mutex<Option<PresentationRequest>>,
    launches: Mutex<Vec<LaunchRecord>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl HeadlessDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn has_channel(&self, id: &str) -> bool {
        self.channels.contains_key(id)
    }

    pub fn channel(&self, id: &str) -> Option<ChannelSpec> {
        self.channels.get(id).map(|entry| entry.value().clone())
    }

    /// Call currently on screen, if any
    pub fn current_presentation(&self) -> Option<PresentationRequest> {
        self.presentation.lock().clone()
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.launches.lock().clone()
    }
}

impl PresentationDriver for HeadlessDriver {
    fn ensure_channel(&self, config: &CallNotifyConfig) -> CallNotifyResult<()> {
        if self.channels.contains_key(&config.channel_id) {
            tracing::debug!(channel_id = %config.channel_id, "Notification channel already exists");
            return Ok(());
        }

        self.channels
            .entry(config.channel_id.clone())
            .or_insert_with(|| ChannelSpec {
                id: config.channel_id.clone(),
                name: config.channel_name.clone(),
                ringtone: config.ringtone.clone(),
                created_at: Utc::now(),
            });
        tracing::info!(
            channel_id = %config.channel_id,
            channel_name = %config.channel_name,
            "Notification channel created"
        );
        Ok(())
    }

    fn start_presenting(&self, request: &PresentationRequest) -> CallNotifyResult<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            channel_id = %request.channel_id,
            room_id = %request.payload.room_id,
            title = %request.title,
            kind = ?request.kind,
            "Presenting incoming call"
        );
        *self.presentation.lock() = Some(request.clone());
        Ok(())
    }

    fn stop_presenting(&self) -> CallNotifyResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if let Some(previous) = self.presentation.lock().take() {
            tracing::info!(room_id = %previous.payload.room_id, "Dismissed incoming call");
        }
        Ok(())
    }

    fn launch(&self, target: &LaunchTarget, extras: &LaunchExtras) -> CallNotifyResult<()> {
        tracing::info!(launch_target = %target, room_id = %extras.room_id, "Launching accepted call");
        self.launches.lock().push(LaunchRecord {
            target: target.clone(),
            extras: extras.clone(),
        });
        Ok(())
    }
}
