//! Tracing-only notifier.

use async_trait::async_trait;
use tracing::info;

use super::{ChannelKey, Notifier, NotifyError, StructuredMessage};
use crate::status::StatusSummary;

/// Writes notifications to the log instead of delivering them.
///
/// Used when no webhook is configured, and by [`super::WebhookNotifier`]
/// for channels without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl LogNotifier {
    /// Creates a new log notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        channel: ChannelKey,
        message: &StructuredMessage,
    ) -> Result<(), NotifyError> {
        info!("{}", message.summary_line(channel));
        Ok(())
    }

    async fn publish_status(&self, summary: &StatusSummary) -> Result<(), NotifyError> {
        info!(
            height = ?summary.last_processed_height,
            "Status: {}",
            summary.activity_text()
        );
        Ok(())
    }
}
