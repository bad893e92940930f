//! Notification host for the stdio binary.
//!
//! There is no display surface behind the MCP transport, so notifications are
//! written to the log and returned in tool output.

use async_trait::async_trait;
use swkit_core::{Error, Notification, NotificationHost};
use url::Url;

pub struct LogNotifier;

#[async_trait]
impl NotificationHost for LogNotifier {
    async fn show(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(title = %notification.title, body = %notification.body, "notification shown");
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        tracing::debug!("notification closed");
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        tracing::info!(%url, "client window opened");
        Ok(())
    }
}
