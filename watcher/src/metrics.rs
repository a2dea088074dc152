//! Watcher metrics.
//!
//! Provides atomic counters for monitoring poll cycles and deliveries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Metrics for the watcher service.
#[derive(Debug)]
pub struct WatcherMetrics {
    /// Cycles started.
    poll_cycles: AtomicU64,

    /// Ticks dropped because a cycle was in flight.
    cycles_skipped: AtomicU64,

    /// Cycles that found an empty range.
    empty_cycles: AtomicU64,

    /// Cycles that committed a checkpoint.
    cycles_committed: AtomicU64,

    /// Domain events classified.
    events_classified: AtomicU64,

    /// Raw entries skipped by the classifier.
    entries_skipped: AtomicU64,

    /// Notifications delivered.
    notifications_sent: AtomicU64,

    /// Notifications that failed.
    notifications_failed: AtomicU64,

    /// Transient ledger read errors.
    transient_errors: AtomicU64,

    /// Failed checkpoint saves.
    persistence_failures: AtomicU64,

    /// Status summaries published.
    status_updates: AtomicU64,

    /// Start time for uptime.
    start_time: Instant,
}

impl Default for WatcherMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl WatcherMetrics {
    /// Creates a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            poll_cycles: AtomicU64::new(0),
            cycles_skipped: AtomicU64::new(0),
            empty_cycles: AtomicU64::new(0),
            cycles_committed: AtomicU64::new(0),
            events_classified: AtomicU64::new(0),
            entries_skipped: AtomicU64::new(0),
            notifications_sent: AtomicU64::new(0),
            notifications_failed: AtomicU64::new(0),
            transient_errors: AtomicU64::new(0),
            persistence_failures: AtomicU64::new(0),
            status_updates: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Records a started cycle.
    pub fn record_poll(&self) {
        self.poll_cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a dropped tick.
    pub fn record_skipped_cycle(&self) {
        self.cycles_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an empty-range cycle.
    pub fn record_empty_cycle(&self) {
        self.empty_cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a committed batch.
    pub fn record_commit(&self, events: usize, skipped: usize) {
        self.cycles_committed.fetch_add(1, Ordering::Relaxed);
        self.events_classified
            .fetch_add(events as u64, Ordering::Relaxed);
        self.entries_skipped
            .fetch_add(skipped as u64, Ordering::Relaxed);
    }

    /// Records a delivered notification.
    pub fn record_notification_sent(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed notification.
    pub fn record_notification_failed(&self) {
        self.notifications_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a transient ledger error.
    pub fn record_transient_error(&self) {
        self.transient_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed checkpoint save.
    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a published status summary.
    pub fn record_status_update(&self) {
        self.status_updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns cycles started.
    #[must_use]
    pub fn poll_cycles(&self) -> u64 {
        self.poll_cycles.load(Ordering::Relaxed)
    }

    /// Returns dropped ticks.
    #[must_use]
    pub fn cycles_skipped(&self) -> u64 {
        self.cycles_skipped.load(Ordering::Relaxed)
    }

    /// Returns empty-range cycles.
    #[must_use]
    pub fn empty_cycles(&self) -> u64 {
        self.empty_cycles.load(Ordering::Relaxed)
    }

    /// Returns committed cycles.
    #[must_use]
    pub fn cycles_committed(&self) -> u64 {
        self.cycles_committed.load(Ordering::Relaxed)
    }

    /// Returns classified events.
    #[must_use]
    pub fn events_classified(&self) -> u64 {
        self.events_classified.load(Ordering::Relaxed)
    }

    /// Returns skipped entries.
    #[must_use]
    pub fn entries_skipped(&self) -> u64 {
        self.entries_skipped.load(Ordering::Relaxed)
    }

    /// Returns delivered notifications.
    #[must_use]
    pub fn notifications_sent(&self) -> u64 {
        self.notifications_sent.load(Ordering::Relaxed)
    }

    /// Returns failed notifications.
    #[must_use]
    pub fn notifications_failed(&self) -> u64 {
        self.notifications_failed.load(Ordering::Relaxed)
    }

    /// Returns transient ledger errors.
    #[must_use]
    pub fn transient_errors(&self) -> u64 {
        self.transient_errors.load(Ordering::Relaxed)
    }

    /// Returns failed checkpoint saves.
    #[must_use]
    pub fn persistence_failures(&self) -> u64 {
        self.persistence_failures.load(Ordering::Relaxed)
    }

    /// Returns published status summaries.
    #[must_use]
    pub fn status_updates(&self) -> u64 {
        self.status_updates.load(Ordering::Relaxed)
    }

    /// Returns the uptime.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns the delivery rate (0.0 to 1.0).
    #[must_use]
    pub fn delivery_rate(&self) -> f64 {
        let sent = self.notifications_sent();
        let total = sent + self.notifications_failed();
        if total > 0 {
            sent as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Returns a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> WatcherMetricsSnapshot {
        WatcherMetricsSnapshot {
            poll_cycles: self.poll_cycles(),
            cycles_skipped: self.cycles_skipped(),
            empty_cycles: self.empty_cycles(),
            cycles_committed: self.cycles_committed(),
            events_classified: self.events_classified(),
            entries_skipped: self.entries_skipped(),
            notifications_sent: self.notifications_sent(),
            notifications_failed: self.notifications_failed(),
            transient_errors: self.transient_errors(),
            persistence_failures: self.persistence_failures(),
            status_updates: self.status_updates(),
            uptime: self.uptime(),
            delivery_rate: self.delivery_rate(),
        }
    }
}

/// A point-in-time snapshot of watcher metrics.
#[derive(Debug, Clone)]
pub struct WatcherMetricsSnapshot {
    /// Cycles started.
    pub poll_cycles: u64,
    /// Dropped ticks.
    pub cycles_skipped: u64,
    /// Empty-range cycles.
    pub empty_cycles: u64,
    /// Committed cycles.
    pub cycles_committed: u64,
    /// Classified events.
    pub events_classified: u64,
    /// Skipped entries.
    pub entries_skipped: u64,
    /// Delivered notifications.
    pub notifications_sent: u64,
    /// Failed notifications.
    pub notifications_failed: u64,
    /// Transient ledger errors.
    pub transient_errors: u64,
    /// Failed checkpoint saves.
    pub persistence_failures: u64,
    /// Published status summaries.
    pub status_updates: u64,
    /// Uptime.
    pub uptime: Duration,
    /// Delivery rate.
    pub delivery_rate: f64,
}
