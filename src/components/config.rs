// Coordinator configuration and full-screen launch targets

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{CallNotifyError, CallNotifyResult};

/// Ring timeout applied when the embedder does not configure one
pub const DEFAULT_RING_TIMEOUT: Duration = Duration::from_millis(45_000);

pub const DEFAULT_ACCEPT_LABEL: &str = "Accept";
pub const DEFAULT_DECLINE_LABEL: &str = "Decline";

/// Configuration applied once through `CallCoordinator::configure`.
///
/// `channel_id`, `channel_name` and `full_screen_target` must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallNotifyConfig {
    /// Notification channel the call notification is posted to
    pub channel_id: String,
    /// User-visible channel name
    pub channel_name: String,
    /// Destination launched when the call is accepted
    pub full_screen_target: String,
    pub notification_icon: Option<String>,
    pub accept_action_label: Option<String>,
    pub decline_action_label: Option<String>,
    pub ringtone: Option<String>,
    /// Ring timeout; `None` uses [`DEFAULT_RING_TIMEOUT`], zero disables it
    pub ring_timeout: Option<Duration>,
    /// Allow an external signaling backend to push status updates
    pub enable_status_listener: bool,
}

impl CallNotifyConfig {
    pub fn new(
        channel_id: impl Into<String>,
        channel_name: impl Into<String>,
        full_screen_target: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            channel_name: channel_name.into(),
            full_screen_target: full_screen_target.into(),
            notification_icon: None,
            accept_action_label: None,
            decline_action_label: None,
            ringtone: None,
            ring_timeout: None,
            enable_status_listener: false,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.notification_icon = Some(icon.into());
        self
    }

    pub fn with_action_labels(
        mut self,
        accept: impl Into<String>,
        decline: impl Into<String>,
    ) -> Self {
        self.accept_action_label = Some(accept.into());
        self.decline_action_label = Some(decline.into());
        self
    }

    pub fn with_ringtone(mut self, ringtone: impl Into<String>) -> Self {
        self.ringtone = Some(ringtone.into());
        self
    }

    pub fn with_ring_timeout(mut self, timeout: Duration) -> Self {
        self.ring_timeout = Some(timeout);
        self
    }

    pub fn with_status_listener(mut self, enabled: bool) -> Self {
        self.enable_status_listener = enabled;
        self
    }

    /// Check the required fields
    pub fn validate(&self) -> CallNotifyResult<()> {
        for (field, value) in [
            ("channelId", &self.channel_id),
            ("channelName", &self.channel_name),
            ("fullScreenTarget", &self.full_screen_target),
        ] {
            if value.is_empty() {
                return Err(CallNotifyError::InvalidConfig {
                    field: field.to_string(),
                    message: format!("{} is required", field),
                });
            }
        }
        Ok(())
    }

    /// Parse the plugin `initialize` argument map.
    ///
    /// Accepts the platform-prefixed keys (`androidChannelId`, ...) as well as
    /// the short forms (`channelId`, `channelName`, `fullScreen`, `timeoutMs`).
    pub fn from_map(map: &Map<String, Value>) -> CallNotifyResult<Self> {
        let channel_id = string_entry(map, &["androidChannelId", "channelId"]).unwrap_or_default();
        let channel_name =
            string_entry(map, &["androidChannelName", "channelName"]).unwrap_or_default();
        let full_screen_target = string_entry(
            map,
            &["androidFullScreenIntentActivity", "fullScreen", "fullScreenTarget"],
        )
        .unwrap_or_default();

        let ring_timeout = ["ringTimeoutMs", "timeoutMs"]
            .iter()
            .find_map(|key| map.get(*key))
            .and_then(timeout_millis)
            .map(Duration::from_millis);

        let enable_status_listener = ["enableFirestoreStatusListener", "enableStatusListener"]
            .iter()
            .find_map(|key| map.get(*key))
            .map(|value| match value {
                Value::Bool(b) => *b,
                Value::String(s) => s.eq_ignore_ascii_case("true"),
                _ => false,
            })
            .unwrap_or(false);

        let config = Self {
            channel_id,
            channel_name,
            full_screen_target,
            notification_icon: string_entry(map, &["androidNotificationIcon", "notificationIcon"]),
            accept_action_label: string_entry(map, &["androidAcceptAction", "acceptActionLabel"]),
            decline_action_label: string_entry(
                map,
                &["androidDeclineAction", "declineActionLabel"],
            ),
            ringtone: string_entry(map, &["androidRingtone", "ringtone"]),
            ring_timeout,
            enable_status_listener,
        };
        config.validate()?;
        Ok(config)
    }

    /// Timeout to arm when a call starts ringing, `None` when disabled
    pub fn effective_ring_timeout(&self) -> Option<Duration> {
        match self.ring_timeout {
            None => Some(DEFAULT_RING_TIMEOUT),
            Some(timeout) if timeout.is_zero() => None,
            Some(timeout) => Some(timeout),
        }
    }

    pub fn accept_label(&self) -> &str {
        self.accept_action_label
            .as_deref()
            .unwrap_or(DEFAULT_ACCEPT_LABEL)
    }

    pub fn decline_label(&self) -> &str {
        self.decline_action_label
            .as_deref()
            .unwrap_or(DEFAULT_DECLINE_LABEL)
    }

    /// Resolve the configured full-screen destination
    pub fn launch_target(&self) -> CallNotifyResult<LaunchTarget> {
        LaunchTarget::parse(&self.full_screen_target)
    }
}

fn string_entry(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Millisecond timeout from a JSON number or numeric string, negatives clamped to 0
fn timeout_millis(value: &Value) -> Option<u64> {
    let clamp = |ms: f64| if ms.is_finite() { ms.max(0.0) as u64 } else { 0 };
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_i64().map(|ms| ms.max(0) as u64))
            .or_else(|| n.as_f64().map(clamp)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(|ms| ms.max(0) as u64)
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(clamp))
        }
        _ => {
            tracing::debug!(value = %value, "ignoring non-numeric ring timeout");
            None
        }
    }
}

static IDENTIFIER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$").ok()
});

fn is_qualified_identifier(value: &str) -> bool {
    IDENTIFIER
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

/// Destination launched once a call is accepted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaunchTarget {
    /// Fully qualified `package/class` component
    Component { package: String, class: String },
    /// Class resolved by the host relative to its own package
    Class(String),
}

impl LaunchTarget {
    /// Parse `package/class`, `package/.Class` or a bare dotted class name
    pub fn parse(raw: &str) -> CallNotifyResult<Self> {
        let raw = raw.trim();
        let invalid = || CallNotifyError::InvalidLaunchTarget(raw.to_string());

        match raw.split_once('/') {
            Some((package, class)) => {
                let class = match class.strip_prefix('.') {
                    Some(relative) => format!("{}.{}", package, relative),
                    None => class.to_string(),
                };
                if is_qualified_identifier(package) && is_qualified_identifier(&class) {
                    Ok(LaunchTarget::Component {
                        package: package.to_string(),
                        class,
                    })
                } else {
                    Err(invalid())
                }
            },
            None if is_qualified_identifier(raw) => Ok(LaunchTarget::Class(raw.to_string())),
            None => Err(invalid()),
        }
    }

    pub fn class_name(&self) -> &str {
        match self {
            LaunchTarget::Component { class, .. } => class,
            LaunchTarget::Class(class) => class,
        }
    }
}

impl std::fmt::Display for LaunchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaunchTarget::Component { package, class } => write!(f, "{}/{}", package, class),
            LaunchTarget::Class(class) => write!(f, "{}", class),
        }
    }
}
