// Presentation driver contract between the coordinator and the host platform
// The coordinator decides *what* happens; drivers decide how it looks on screen

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::config::{CallNotifyConfig, LaunchTarget};
use super::payload::{CallKind, CallPayload};
use super::CallNotifyResult;

/// Side effects the coordinator delegates to the host platform.
///
/// Every method is called while the coordinator holds its state lock, so
/// implementations must return quickly and must not call back into the
/// coordinator on the same thread.
pub trait PresentationDriver: Send + Sync {
    /// Make sure the notification channel exists; must no-op if it already does
    fn ensure_channel(&self, config: &CallNotifyConfig) -> CallNotifyResult<()>;

    /// Show the incoming call notification and full-screen UI
    fn start_presenting(&self, request: &PresentationRequest) -> CallNotifyResult<()>;

    /// Dismiss whatever `start_presenting` put on screen
    fn stop_presenting(&self) -> CallNotifyResult<()>;

    /// Open the application's accepted-call destination
    fn launch(&self, target: &LaunchTarget, extras: &LaunchExtras) -> CallNotifyResult<()>;
}

/// Everything a driver needs to render the incoming call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationRequest {
    pub channel_id: String,
    pub title: String,
    pub body: String,
    pub accept_label: String,
    pub decline_label: String,
    pub icon: Option<String>,
    pub ringtone: Option<String>,
    pub kind: CallKind,
    pub avatar: Option<Url>,
    pub full_screen: bool,
    pub ring_timeout: Option<Duration>,
    pub payload: CallPayload,
}

impl PresentationRequest {
    pub fn new(config: &CallNotifyConfig, payload: &CallPayload) -> Self {
        let kind = payload.kind();
        let body = match kind {
            CallKind::Audio => "Incoming call",
            CallKind::Video => "Incoming video call",
        };

        let avatar = payload
            .avatar_url
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .and_then(|raw| match Url::parse(raw) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::debug!(room_id = %payload.room_id, "Ignoring invalid avatar URL: {}", e);
                    None
                },
            });

        Self {
            channel_id: config.channel_id.clone(),
            title: payload.caller_name.clone(),
            body: body.to_string(),
            accept_label: config.accept_label().to_string(),
            decline_label: config.decline_label().to_string(),
            icon: config.notification_icon.clone(),
            ringtone: config.ringtone.clone(),
            kind,
            avatar,
            full_screen: true,
            ring_timeout: config.effective_ring_timeout(),
            payload: payload.clone(),
        }
    }
}

/// Identifying fields handed to the accepted-call destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchExtras {
    pub room_id: String,
    pub call_id: String,
    pub caller_name: String,
    pub caller_id: String,
    pub media_type: Option<String>,
    #[serde(rename = "type")]
    pub call_type: String,
    pub payload: CallPayload,
}

impl From<&CallPayload> for LaunchExtras {
    fn from(payload: &CallPayload) -> Self {
        Self {
            room_id: payload.room_id.clone(),
            call_id: payload.call_id.clone(),
            caller_name: payload.caller_name.clone(),
            caller_id: payload.caller_id.clone(),
            media_type: payload.media_type.clone(),
            call_type: payload.call_type.clone(),
            payload: payload.clone(),
        }
    }
}
