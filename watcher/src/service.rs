//! Main watcher service.
//!
//! Drives the poll cycle: resolve the range, fetch, classify, fold into the
//! totals, persist, then notify. The checkpoint is saved before any
//! notification goes out, so a crash between the two loses messages but
//! never counts a swap twice.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use swapwatch_ledger::{classify_batch, LedgerReader, MONITORED_EVENTS};
use tokio::sync::{watch, Mutex, Notify};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::checkpoint::{Checkpoint, CheckpointStore, PollRange};
use crate::config::WatcherConfig;
use crate::error::WatcherError;
use crate::metrics::WatcherMetrics;
use crate::notifier::{Notifier, NotifierGateway};
use crate::status::StatusSummary;

/// Where the current cycle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CyclePhase {
    /// No cycle in flight.
    Idle,
    /// Resolving the ledger height.
    Scanning,
    /// Fetching and classifying the range.
    Classifying,
    /// Folding totals and saving the checkpoint.
    Committing,
    /// Dispatching notifications.
    Notifying,
}

impl CyclePhase {
    /// Returns the phase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Classifying => "classifying",
            Self::Committing => "committing",
            Self::Notifying => "notifying",
        }
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a committed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Range that was scanned and committed.
    pub range: PollRange,
    /// Domain events classified.
    pub events: usize,
    /// Raw entries skipped.
    pub skipped: usize,
    /// Notifications delivered.
    pub notified: usize,
    /// Notifications that failed.
    pub notify_failed: usize,
}

/// What a call to [`WatcherService::run_cycle`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle was in flight; nothing happened.
    Skipped,
    /// The checkpoint was initialized to `height`; no events processed.
    Initialized {
        /// Starting height persisted.
        height: u64,
    },
    /// The range was empty; the checkpoint is unchanged.
    Empty {
        /// Range start.
        from: u64,
        /// Range end.
        to: u64,
    },
    /// A range was committed.
    Committed(CycleReport),
}

/// The watcher service.
pub struct WatcherService {
    /// Configuration.
    config: WatcherConfig,

    /// Ledger reader.
    reader: Arc<dyn LedgerReader>,

    /// Checkpoint store.
    store: Arc<dyn CheckpointStore>,

    /// Notification gateway.
    gateway: NotifierGateway,

    /// Metrics.
    metrics: Arc<WatcherMetrics>,

    /// Authoritative checkpoint; held for the whole cycle.
    checkpoint: Mutex<Checkpoint>,

    /// Last committed checkpoint for readers.
    snapshot: watch::Sender<Checkpoint>,

    /// Current cycle phase.
    phase: watch::Sender<CyclePhase>,

    /// Whether the service is running.
    running: AtomicBool,

    /// Wakes `run` on stop.
    shutdown: Notify,
}

impl WatcherService {
    /// Creates the service and loads the stored checkpoint.
    ///
    /// With `reset_checkpoint` set, the stored checkpoint is overwritten with
    /// an uninitialized one first.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the checkpoint
    /// cannot be loaded.
    pub async fn load(
        config: WatcherConfig,
        reader: Arc<dyn LedgerReader>,
        store: Arc<dyn CheckpointStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, WatcherError> {
        config.validate()?;

        if config.reset_checkpoint {
            warn!("Resetting checkpoint; totals and height start over");
            store.save(&Checkpoint::default()).await?;
        }

        let checkpoint = store.load().await?;
        match checkpoint.last_processed_height {
            Some(height) => info!(
                "Loaded checkpoint at height {} ({})",
                height,
                StatusSummary::from_checkpoint(&checkpoint, config.labels())
            ),
            None => info!("No checkpoint yet, first cycle will initialize"),
        }

        let metrics = Arc::new(WatcherMetrics::new());
        let gateway = NotifierGateway::with_metrics(
            notifier,
            config.labels(),
            config.explorer_base_url.clone(),
            Arc::clone(&metrics),
        );

        let (snapshot, _) = watch::channel(checkpoint.clone());
        let (phase, _) = watch::channel(CyclePhase::Idle);

        Ok(Self {
            config,
            reader,
            store,
            gateway,
            metrics,
            checkpoint: Mutex::new(checkpoint),
            snapshot,
            phase,
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
        })
    }

    /// Returns the metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<WatcherMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Returns the current cycle phase.
    #[must_use]
    pub fn phase(&self) -> CyclePhase {
        *self.phase.borrow()
    }

    /// Returns the last committed checkpoint.
    ///
    /// Never waits on an in-flight cycle.
    #[must_use]
    pub fn snapshot(&self) -> Checkpoint {
        self.snapshot.borrow().clone()
    }

    /// Subscribes to committed checkpoints.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Checkpoint> {
        self.snapshot.subscribe()
    }

    /// Returns the status summary for the last committed checkpoint.
    #[must_use]
    pub fn status(&self) -> StatusSummary {
        StatusSummary::from_checkpoint(&self.snapshot(), self.gateway.labels().clone())
    }

    /// Publishes the status summary through the notifier.
    pub async fn publish_status(&self) -> StatusSummary {
        let summary = self.status();
        self.gateway.publish_status(&summary).await;
        self.metrics.record_status_update();
        summary
    }

    /// Returns true if the service is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops the service.
    ///
    /// An in-flight cycle runs to completion first.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_waiters();
        info!("Watcher service stop requested");
    }

    /// Runs one poll cycle.
    ///
    /// Returns [`CycleOutcome::Skipped`] without touching anything if another
    /// cycle holds the checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger read, the checkpoint save or the
    /// aggregation failed. The checkpoint is unchanged in every error case.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, WatcherError> {
        let Ok(mut checkpoint) = self.checkpoint.try_lock() else {
            self.metrics.record_skipped_cycle();
            debug!("Cycle already in flight, dropping tick");
            return Ok(CycleOutcome::Skipped);
        };

        self.metrics.record_poll();
        let result = self.cycle(&mut checkpoint).await;
        self.set_phase(CyclePhase::Idle);

        if let Err(ref e) = result {
            match e {
                WatcherError::Ledger(le) if le.is_transient() => {
                    self.metrics.record_transient_error();
                }
                WatcherError::Persistence(_) => self.metrics.record_persistence_failure(),
                _ => {}
            }
        }

        result
    }

    async fn cycle(&self, checkpoint: &mut Checkpoint) -> Result<CycleOutcome, WatcherError> {
        self.set_phase(CyclePhase::Scanning);
        let current = self.reader.current_height().await?;

        let Some(range) = checkpoint.next_range(current) else {
            return self.initialize(checkpoint, current).await;
        };

        if range.is_empty() {
            if current < range.from.saturating_sub(1) {
                warn!(
                    "Ledger height {} is behind checkpoint {}, waiting",
                    current,
                    range.from.saturating_sub(1)
                );
            } else {
                debug!("No new blocks at height {}", current);
            }
            self.metrics.record_empty_cycle();
            return Ok(CycleOutcome::Empty {
                from: range.from,
                to: range.to,
            });
        }

        self.set_phase(CyclePhase::Classifying);
        debug!(
            "Polling {} blocks, {} to {}",
            range.len(),
            range.from,
            range.to
        );
        let entries = self
            .reader
            .get_events(range.from, range.to, &MONITORED_EVENTS)
            .await?;
        let batch = classify_batch(&entries);

        self.set_phase(CyclePhase::Committing);
        let totals = checkpoint.totals.fold(&batch.events)?;
        let candidate = checkpoint.advanced(range.to, totals);
        if let Err(e) = self.store.save(&candidate).await {
            warn!(
                "Checkpoint save failed, blocks {} to {} will be re-read: {}",
                range.from, range.to, e
            );
            return Err(e.into());
        }
        *checkpoint = candidate;
        self.snapshot.send_replace(checkpoint.clone());
        self.metrics
            .record_commit(batch.events.len(), batch.skipped.len());

        self.set_phase(CyclePhase::Notifying);
        let report = self.gateway.dispatch_all(&batch.events).await;

        info!(
            "Committed blocks {} to {}: {} events, {} skipped, {} notified, {} failed",
            range.from,
            range.to,
            batch.events.len(),
            batch.skipped.len(),
            report.sent,
            report.failed
        );

        Ok(CycleOutcome::Committed(CycleReport {
            range,
            events: batch.events.len(),
            skipped: batch.skipped.len(),
            notified: report.sent,
            notify_failed: report.failed,
        }))
    }

    async fn initialize(
        &self,
        checkpoint: &mut Checkpoint,
        current: u64,
    ) -> Result<CycleOutcome, WatcherError> {
        let height = current.saturating_sub(self.config.backfill_blocks);
        let candidate = Checkpoint::at(height, checkpoint.totals.clone());

        self.set_phase(CyclePhase::Committing);
        self.store.save(&candidate).await?;
        *checkpoint = candidate;
        self.snapshot.send_replace(checkpoint.clone());

        info!("Starting polling from block {} (tip {})", height, current);
        Ok(CycleOutcome::Initialized { height })
    }

    fn set_phase(&self, phase: CyclePhase) {
        let previous = self.phase.send_replace(phase);
        if previous != phase {
            debug!("Cycle phase {} -> {}", previous, phase);
        }
    }

    /// Runs the watcher until stopped.
    ///
    /// Poll and status ticks that fall due while a cycle is in flight are
    /// skipped rather than queued.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; transient ones are logged and retried
    /// on the next tick.
    pub async fn run(&self) -> Result<(), WatcherError> {
        self.running.store(true, Ordering::SeqCst);

        info!(
            "Watcher service started (poll every {:?}, status every {:?})",
            self.config.poll_interval(),
            self.config.status_interval()
        );

        let mut poll = interval(self.config.poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let status_period = self.config.status_interval();
        let mut status = interval_at(Instant::now() + status_period, status_period);
        status.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            // Registered before the flag check so a stop in between is not lost.
            let shutdown = self.shutdown.notified();
            tokio::pin!(shutdown);
            shutdown.as_mut().enable();
            if !self.is_running() {
                break;
            }

            tokio::select! {
                () = &mut shutdown => break,
                _ = poll.tick() => match self.run_cycle().await {
                    Ok(outcome) => debug!("Cycle finished: {:?}", outcome),
                    Err(e) if e.is_fatal() => {
                        error!("Fatal error, stopping: {}", e);
                        self.running.store(false, Ordering::SeqCst);
                        return Err(e);
                    }
                    Err(e) => warn!("Cycle failed, retrying next tick: {}", e),
                },
                _ = status.tick() => {
                    let summary = self.publish_status().await;
                    debug!("Published status: {}", summary);
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Watcher service stopped");
        Ok(())
    }
}
