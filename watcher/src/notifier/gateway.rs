//! Notifier gateway.
//!
//! Turns committed domain events into messages and hands them to the
//! configured sink one at a time, in order.

use std::sync::Arc;

use swapwatch_ledger::events::DomainEvent;
use tracing::{debug, warn};

use super::{ChannelKey, Notifier, NotifyError, StructuredMessage};
use crate::metrics::WatcherMetrics;
use crate::status::{AssetLabels, StatusSummary};

/// Outcome of dispatching a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Messages delivered.
    pub sent: usize,
    /// Messages that failed.
    pub failed: usize,
}

impl DispatchReport {
    /// Returns the number of dispatch attempts.
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.sent + self.failed
    }
}

/// Routes events to a notifier with per-event failure isolation.
pub struct NotifierGateway {
    notifier: Arc<dyn Notifier>,
    labels: AssetLabels,
    explorer_base_url: String,
    metrics: Option<Arc<WatcherMetrics>>,
}

impl NotifierGateway {
    /// Creates a gateway.
    #[must_use]
    pub fn new(
        notifier: Arc<dyn Notifier>,
        labels: AssetLabels,
        explorer_base_url: impl Into<String>,
    ) -> Self {
        Self {
            notifier,
            labels,
            explorer_base_url: explorer_base_url.into(),
            metrics: None,
        }
    }

    /// Creates a gateway that records delivery metrics.
    #[must_use]
    pub fn with_metrics(
        notifier: Arc<dyn Notifier>,
        labels: AssetLabels,
        explorer_base_url: impl Into<String>,
        metrics: Arc<WatcherMetrics>,
    ) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::new(notifier, labels, explorer_base_url)
        }
    }

    /// Returns the asset labels.
    #[must_use]
    pub const fn labels(&self) -> &AssetLabels {
        &self.labels
    }

    /// Builds the message for an event.
    #[must_use]
    pub fn message_for(&self, event: &DomainEvent) -> StructuredMessage {
        StructuredMessage::from_event(event, &self.labels, &self.explorer_base_url)
    }

    /// Dispatches a single event.
    ///
    /// # Errors
    ///
    /// Returns the sink's error; callers in the cycle use
    /// [`dispatch_all`](Self::dispatch_all) which never fails.
    pub async fn dispatch(&self, event: &DomainEvent) -> Result<(), NotifyError> {
        let channel = ChannelKey::for_event(event);
        let message = self.message_for(event);
        self.notifier.send(channel, &message).await
    }

    /// Dispatches every event in order.
    ///
    /// Failures are logged and counted; later events are still attempted
    /// and nothing is retried.
    pub async fn dispatch_all(&self, events: &[DomainEvent]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for event in events {
            let origin = event.origin();
            match self.dispatch(event).await {
                Ok(()) => {
                    report.sent += 1;
                    if let Some(ref metrics) = self.metrics {
                        metrics.record_notification_sent();
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    if let Some(ref metrics) = self.metrics {
                        metrics.record_notification_failed();
                    }
                    warn!(
                        "Notification for {} at block {} log {} failed: {}",
                        event.kind().as_str(),
                        origin.block_height,
                        origin.log_index,
                        e
                    );
                }
            }
        }

        debug!(
            "Dispatched {} notifications ({} failed)",
            report.attempted(),
            report.failed
        );
        report
    }

    /// Publishes a status summary, logging failures.
    pub async fn publish_status(&self, summary: &StatusSummary) {
        if let Err(e) = self.notifier.publish_status(summary).await {
            warn!("Status update failed: {}", e);
        }
    }
}
