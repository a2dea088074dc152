//! Swapwatch Watcher - Checkpointed polling of a contract's event log.
//!
//! This crate provides the service that polls the ledger for new contract
//! events, folds completed swaps into running totals, persists progress,
//! and forwards every event to a notification sink. Progress and totals are
//! saved together before any notification is sent, so a restart never
//! counts a swap twice.
//!
//! # Components
//!
//! - [`config`]: Watcher configuration
//! - [`checkpoint`]: Durable progress record and stores
//! - [`aggregator`]: Running swap totals
//! - [`notifier`]: Notification gateway and sinks
//! - [`service`]: Poll cycle and scheduler
//! - [`status`]: Derived status summary
//! - [`metrics`]: Watcher metrics
//! - [`error`]: Cycle errors

pub mod aggregator;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod metrics;
pub mod notifier;
pub mod service;
pub mod status;

pub use aggregator::{AggregateError, RunningTotals};
pub use checkpoint::{
    Checkpoint, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, PersistenceError,
    PollRange,
};
pub use config::{ConfigError, WatcherConfig};
pub use error::WatcherError;
pub use metrics::WatcherMetrics;
pub use notifier::{
    ChannelKey, DispatchReport, LogNotifier, Notifier, NotifierGateway, NotifyError,
    StructuredMessage, WebhookNotifier,
};
pub use service::{CycleOutcome, CyclePhase, CycleReport, WatcherService};
pub use status::{AssetLabels, StatusSummary};
