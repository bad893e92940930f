//! Push message and notification-click handling.
//!
//! Display is delegated to a [`NotificationHost`]; a host refusal (e.g. the
//! user denied permission) is logged and the feature is silently unavailable.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// Fixed notification title ("Friends Association").
pub const NOTIFICATION_TITLE: &str = "ফ্রেন্ডস এসোসিয়েশন";

/// Body used when a push carries no payload ("you have a new message").
pub const DEFAULT_BODY: &str = "নতুন বার্তা পেয়েছেন";

pub const VIBRATE_PATTERN: [u32; 3] = [100, 50, 100];

pub const ACTION_VIEW: &str = "view";
pub const ACTION_CLOSE: &str = "close";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A notification ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    /// Routing data from a JSON payload; only read on click.
    pub data: serde_json::Value,
    pub actions: Vec<NotificationAction>,
}

/// What a notification click did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome", content = "url", rename_all = "lowercase")]
pub enum ClickOutcome {
    Opened(String),
    Dismissed,
}

/// Host capabilities needed to surface notifications.
#[async_trait]
pub trait NotificationHost: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<(), Error>;

    /// Close the clicked notification.
    async fn close(&self) -> Result<(), Error>;

    /// Open the URL in a client window, or focus one already showing it.
    async fn open_window(&self, url: &Url) -> Result<(), Error>;
}

/// Builds notifications from push payloads and routes clicks.
#[derive(Clone)]
pub struct PushHandler {
    icon: String,
    app_root: Url,
    host: Arc<dyn NotificationHost>,
}

impl PushHandler {
    pub fn new(icon: impl Into<String>, app_root: Url, host: Arc<dyn NotificationHost>) -> Self {
        Self { icon: icon.into(), app_root, host }
    }

    /// Build the notification for a push payload.
    ///
    /// The payload text is the body verbatim; if it also parses as JSON it is
    /// attached as routing data.
    pub fn build(&self, payload: Option<&[u8]>) -> Notification {
        let (body, data) = match payload {
            Some(bytes) => {
                let text = String::from_utf8_lossy(bytes).into_owned();
                let data = serde_json::from_slice(bytes).unwrap_or_else(|_| serde_json::json!({}));
                (text, data)
            }
            None => (DEFAULT_BODY.to_string(), serde_json::json!({})),
        };

        Notification {
            title: NOTIFICATION_TITLE.to_string(),
            body,
            icon: self.icon.clone(),
            badge: self.icon.clone(),
            vibrate: VIBRATE_PATTERN.to_vec(),
            data,
            actions: vec![
                NotificationAction {
                    action: ACTION_VIEW.into(),
                    title: "দেখুন".into(),
                    icon: Some(self.icon.clone()),
                },
                NotificationAction { action: ACTION_CLOSE.into(), title: "বন্ধ করুন".into(), icon: None },
            ],
        }
    }

    /// Build and display a notification for a push payload.
    pub async fn handle_push(&self, payload: Option<&[u8]>) -> Notification {
        let notification = self.build(payload);
        if let Err(e) = self.host.show(&notification).await {
            tracing::warn!(error = %e, "notification not shown");
        }
        notification
    }

    /// Close the notification; the `view` action also opens the app root.
    pub async fn handle_click(&self, action: Option<&str>) -> ClickOutcome {
        if let Err(e) = self.host.close().await {
            tracing::debug!(error = %e, "notification close failed");
        }

        if action != Some(ACTION_VIEW) {
            return ClickOutcome::Dismissed;
        }

        if let Err(e) = self.host.open_window(&self.app_root).await {
            tracing::warn!(url = %self.app_root, error = %e, "failed to open client window");
            return ClickOutcome::Dismissed;
        }
        ClickOutcome::Opened(self.app_root.to_string())
    }
}
