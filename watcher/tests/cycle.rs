//! End-to-end poll cycle tests against in-memory fakes.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use swapwatch_ledger::{LedgerError, LedgerReader, RawLogEntry};
use swapwatch_watcher::aggregator::Accumulator;
use swapwatch_watcher::{
    ChannelKey, Checkpoint, CheckpointStore, CycleOutcome, FileCheckpointStore,
    MemoryCheckpointStore, Notifier, NotifyError, PollRange, StructuredMessage, WatcherConfig,
    WatcherError, WatcherService,
};

const ONE_BASE: u128 = 1_000_000_000_000_000_000;
const ONE_QUOTE: u128 = 1_000_000;

/// Ledger with a settable tip and a fixed set of log entries.
#[derive(Default)]
struct ScriptedLedger {
    height: AtomicU64,
    entries: Mutex<Vec<RawLogEntry>>,
    fail_next_read: Mutex<Option<LedgerError>>,
    event_reads: Mutex<Vec<(u64, u64)>>,
    height_delay_ms: AtomicU64,
}

impl ScriptedLedger {
    fn at(height: u64) -> Arc<Self> {
        let ledger = Self::default();
        ledger.height.store(height, Ordering::SeqCst);
        Arc::new(ledger)
    }

    fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }

    fn push(&self, entry: RawLogEntry) {
        self.entries.lock().expect("lock").push(entry);
    }

    fn fail_next_read(&self, error: LedgerError) {
        *self.fail_next_read.lock().expect("lock") = Some(error);
    }

    fn event_reads(&self) -> Vec<(u64, u64)> {
        self.event_reads.lock().expect("lock").clone()
    }
}

#[async_trait]
impl LedgerReader for ScriptedLedger {
    async fn current_height(&self) -> Result<u64, LedgerError> {
        let delay = self.height_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(self.height.load(Ordering::SeqCst))
    }

    async fn get_events(
        &self,
        from: u64,
        to: u64,
        _event_names: &[&str],
    ) -> Result<Vec<RawLogEntry>, LedgerError> {
        self.event_reads.lock().expect("lock").push((from, to));
        if let Some(error) = self.fail_next_read.lock().expect("lock").take() {
            return Err(error);
        }

        let mut entries: Vec<RawLogEntry> = self
            .entries
            .lock()
            .expect("lock")
            .iter()
            .filter(|e| e.block_height >= from && e.block_height <= to)
            .cloned()
            .collect();
        entries.sort_by_key(RawLogEntry::position);
        Ok(entries)
    }
}

/// Notifier that records deliveries and can fail one channel.
#[derive(Default)]
struct RecordingNotifier {
    failing: Mutex<Option<ChannelKey>>,
    delivered: Mutex<Vec<(ChannelKey, StructuredMessage)>>,
    attempts: AtomicU64,
}

impl RecordingNotifier {
    fn failing_on(channel: ChannelKey) -> Arc<Self> {
        let notifier = Self::default();
        *notifier.failing.lock().expect("lock") = Some(channel);
        Arc::new(notifier)
    }

    fn delivered(&self) -> Vec<(ChannelKey, StructuredMessage)> {
        self.delivered.lock().expect("lock").clone()
    }

    fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        channel: ChannelKey,
        message: &StructuredMessage,
    ) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if *self.failing.lock().expect("lock") == Some(channel) {
            return Err(NotifyError::Rejected { status: 503 });
        }
        self.delivered
            .lock()
            .expect("lock")
            .push((channel, message.clone()));
        Ok(())
    }
}

/// Notifier that reads the checkpoint file at the moment of each send, then
/// fails as if the process died before delivering.
struct DiskReadingNotifier {
    store: FileCheckpointStore,
    on_disk: tokio::sync::Mutex<Vec<Checkpoint>>,
}

impl DiskReadingNotifier {
    fn new(store: FileCheckpointStore) -> Arc<Self> {
        Arc::new(Self {
            store,
            on_disk: tokio::sync::Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Notifier for DiskReadingNotifier {
    async fn send(
        &self,
        _channel: ChannelKey,
        _message: &StructuredMessage,
    ) -> Result<(), NotifyError> {
        let checkpoint = self.store.load().await.expect("checkpoint readable during dispatch");
        self.on_disk.lock().await.push(checkpoint);
        Err(NotifyError::Rejected { status: 503 })
    }
}

/// Store whose saves can be refused on demand.
struct SwitchableStore {
    inner: MemoryCheckpointStore,
    refuse: AtomicBool,
}

impl SwitchableStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryCheckpointStore::new(),
            refuse: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl CheckpointStore for SwitchableStore {
    async fn load(&self) -> Result<Checkpoint, swapwatch_watcher::PersistenceError> {
        self.inner.load().await
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), swapwatch_watcher::PersistenceError> {
        self.inner
            .set_unavailable(self.refuse.load(Ordering::SeqCst));
        self.inner.save(checkpoint).await
    }
}

fn config() -> WatcherConfig {
    WatcherConfig::new(
        "http://127.0.0.1:8545",
        "0x1111111111111111111111111111111111111111",
    )
    .with_backfill_blocks(100)
}

fn word(value: u128) -> B256 {
    B256::from(U256::from(value))
}

fn swap(block: u64, log_index: u64, base: u128, quote: u128) -> RawLogEntry {
    RawLogEntry {
        event_name: "SwapCompleted".to_string(),
        indexed_args: vec![Address::repeat_byte(0x02).into_word()],
        data_args: vec![word(7), word(quote), word(base)],
        block_height: block,
        tx_hash: B256::repeat_byte(block as u8),
        log_index,
    }
}

fn listing(block: u64, log_index: u64) -> RawLogEntry {
    RawLogEntry {
        event_name: "ListingCreated".to_string(),
        indexed_args: vec![Address::repeat_byte(0x01).into_word()],
        data_args: vec![word(8), word(3 * ONE_BASE), word(15 * ONE_QUOTE)],
        block_height: block,
        tx_hash: B256::repeat_byte(0x40),
        log_index,
    }
}

fn offer(block: u64, log_index: u64) -> RawLogEntry {
    RawLogEntry {
        event_name: "OfferAccepted".to_string(),
        indexed_args: vec![
            Address::repeat_byte(0x01).into_word(),
            Address::repeat_byte(0x03).into_word(),
        ],
        data_args: vec![word(9), word(4 * ONE_QUOTE), word(ONE_BASE)],
        block_height: block,
        tx_hash: B256::repeat_byte(0x50),
        log_index,
    }
}

async fn start(
    ledger: &Arc<ScriptedLedger>,
    store: Arc<dyn CheckpointStore>,
    notifier: &Arc<RecordingNotifier>,
) -> WatcherService {
    WatcherService::load(
        config(),
        Arc::clone(ledger) as Arc<dyn LedgerReader>,
        store,
        Arc::clone(notifier) as Arc<dyn Notifier>,
    )
    .await
    .expect("service")
}

#[tokio::test]
async fn test_first_cycle_initializes_behind_tip() {
    let ledger = ScriptedLedger::at(150);
    let store = Arc::new(MemoryCheckpointStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = start(&ledger, store.clone(), &notifier).await;

    let outcome = service.run_cycle().await.expect("cycle");

    assert_eq!(outcome, CycleOutcome::Initialized { height: 50 });
    assert!(ledger.event_reads().is_empty());
    assert_eq!(notifier.attempts(), 0);
    assert_eq!(
        store.load().await.expect("load").last_processed_height,
        Some(50)
    );
}

#[tokio::test]
async fn test_swap_feeds_totals_and_ratio() {
    let ledger = ScriptedLedger::at(150);
    let notifier = Arc::new(RecordingNotifier::default());
    let service = start(&ledger, Arc::new(MemoryCheckpointStore::new()), &notifier).await;
    service.run_cycle().await.expect("init");

    ledger.push(swap(100, 0, 2 * ONE_BASE, 10 * ONE_QUOTE));
    let outcome = service.run_cycle().await.expect("cycle");

    let CycleOutcome::Committed(report) = outcome else {
        panic!("expected commit, got {:?}", outcome);
    };
    assert_eq!(report.range, PollRange { from: 51, to: 150 });
    assert_eq!(report.events, 1);
    assert_eq!(report.notified, 1);

    let snapshot = service.snapshot();
    assert_eq!(snapshot.last_processed_height, Some(150));
    assert_eq!(snapshot.totals.base_sum(), Accumulator::from(2 * ONE_BASE));
    assert_eq!(snapshot.totals.quote_sum(), Accumulator::from(10 * ONE_QUOTE));
    assert_eq!(snapshot.totals.avg_ratio().as_deref(), Some("5.000000"));
    assert_eq!(
        service.status().activity_text(),
        "Avg: 1 VTRU = 5.000000 USDC"
    );

    let delivered = notifier.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, ChannelKey::Swap);
    assert_eq!(delivered[0].1.field("VTRU Amount"), Some("2.0"));
    assert_eq!(delivered[0].1.field("USDC Amount"), Some("10.0"));
}

#[tokio::test]
async fn test_empty_range_reads_only_height() {
    let ledger = ScriptedLedger::at(150);
    let store = Arc::new(MemoryCheckpointStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = start(&ledger, store.clone(), &notifier).await;
    service.run_cycle().await.expect("init");
    service.run_cycle().await.expect("commit");

    let before = service.snapshot();
    let saves = store.save_count();
    let reads = ledger.event_reads().len();

    let outcome = service.run_cycle().await.expect("cycle");

    assert_eq!(outcome, CycleOutcome::Empty { from: 151, to: 150 });
    assert_eq!(ledger.event_reads().len(), reads);
    assert_eq!(store.save_count(), saves);
    assert_eq!(service.snapshot(), before);
}

#[tokio::test]
async fn test_malformed_entry_is_skipped_and_batch_commits() {
    let ledger = ScriptedLedger::at(150);
    let notifier = Arc::new(RecordingNotifier::default());
    let service = start(&ledger, Arc::new(MemoryCheckpointStore::new()), &notifier).await;
    service.run_cycle().await.expect("init");

    let mut broken = swap(90, 1, ONE_BASE, ONE_QUOTE);
    broken.data_args.truncate(2);
    ledger.push(swap(90, 0, ONE_BASE, 2 * ONE_QUOTE));
    ledger.push(broken);
    ledger.push(swap(91, 0, ONE_BASE, 4 * ONE_QUOTE));

    let CycleOutcome::Committed(report) = service.run_cycle().await.expect("cycle") else {
        panic!("expected commit");
    };

    assert_eq!(report.events, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(service.snapshot().last_processed_height, Some(150));
    assert_eq!(
        service.snapshot().totals.quote_sum(),
        Accumulator::from(6 * ONE_QUOTE)
    );
    assert_eq!(service.metrics().entries_skipped(), 1);
}

#[tokio::test]
async fn test_transient_read_error_leaves_range_for_retry() {
    let ledger = ScriptedLedger::at(150);
    let notifier = Arc::new(RecordingNotifier::default());
    let service = start(&ledger, Arc::new(MemoryCheckpointStore::new()), &notifier).await;
    service.run_cycle().await.expect("init");

    ledger.push(swap(60, 0, ONE_BASE, ONE_QUOTE));
    ledger.fail_next_read(LedgerError::Transient("connection reset".to_string()));

    let err = service.run_cycle().await.expect_err("transient");
    assert!(!err.is_fatal());
    assert_eq!(service.snapshot().last_processed_height, Some(50));
    assert!(service.snapshot().totals.is_empty());
    assert_eq!(notifier.attempts(), 0);
    assert_eq!(service.metrics().transient_errors(), 1);

    let outcome = service.run_cycle().await.expect("retry");
    assert!(matches!(outcome, CycleOutcome::Committed(_)));
    assert_eq!(ledger.event_reads(), vec![(51, 150), (51, 150)]);
    assert_eq!(service.snapshot().totals.base_sum(), Accumulator::from(ONE_BASE));
}

#[tokio::test]
async fn test_fatal_read_error_is_reported_as_fatal() {
    let ledger = ScriptedLedger::at(150);
    let notifier = Arc::new(RecordingNotifier::default());
    let service = start(&ledger, Arc::new(MemoryCheckpointStore::new()), &notifier).await;
    service.run_cycle().await.expect("init");

    ledger.fail_next_read(LedgerError::FatalConfig("method not found".to_string()));

    let err = service.run_cycle().await.expect_err("fatal");
    assert!(err.is_fatal());
    assert!(matches!(err, WatcherError::Ledger(_)));
    assert_eq!(service.snapshot().last_processed_height, Some(50));
}

#[tokio::test]
async fn test_persistence_failure_does_not_double_count() {
    let ledger = ScriptedLedger::at(150);
    let store = SwitchableStore::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let service = start(&ledger, store.clone(), &notifier).await;
    service.run_cycle().await.expect("init");

    ledger.push(swap(70, 0, 2 * ONE_BASE, 10 * ONE_QUOTE));
    store.refuse.store(true, Ordering::SeqCst);

    let err = service.run_cycle().await.expect_err("save refused");
    assert!(matches!(err, WatcherError::Persistence(_)));
    assert!(!err.is_fatal());
    assert_eq!(service.snapshot().last_processed_height, Some(50));
    assert!(service.snapshot().totals.is_empty());
    assert_eq!(notifier.attempts(), 0);
    assert_eq!(service.metrics().persistence_failures(), 1);

    store.refuse.store(false, Ordering::SeqCst);
    service.run_cycle().await.expect("retry");

    let snapshot = service.snapshot();
    assert_eq!(snapshot.last_processed_height, Some(150));
    assert_eq!(snapshot.totals.base_sum(), Accumulator::from(2 * ONE_BASE));
    assert_eq!(snapshot.totals.quote_sum(), Accumulator::from(10 * ONE_QUOTE));
    assert_eq!(notifier.delivered().len(), 1);
    assert_eq!(store.load().await.expect("load"), snapshot);
}

#[tokio::test]
async fn test_restart_after_commit_keeps_totals() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("checkpoint.json");
    let ledger = ScriptedLedger::at(150);

    let first_notifier = Arc::new(RecordingNotifier::default());
    let first = start(
        &ledger,
        Arc::new(FileCheckpointStore::new(&path)),
        &first_notifier,
    )
    .await;
    first.run_cycle().await.expect("init");
    ledger.push(swap(120, 0, 2 * ONE_BASE, 10 * ONE_QUOTE));
    first.run_cycle().await.expect("commit");
    let committed = first.snapshot();
    drop(first);

    let second_notifier = Arc::new(RecordingNotifier::default());
    let second = start(
        &ledger,
        Arc::new(FileCheckpointStore::new(&path)),
        &second_notifier,
    )
    .await;

    assert_eq!(second.snapshot(), committed);
    let outcome = second.run_cycle().await.expect("cycle");

    assert_eq!(outcome, CycleOutcome::Empty { from: 151, to: 150 });
    assert_eq!(second.snapshot().totals, committed.totals);
    assert_eq!(second_notifier.attempts(), 0);
}

#[tokio::test]
async fn test_commit_is_on_disk_before_dispatch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("checkpoint.json");
    let ledger = ScriptedLedger::at(150);

    let dispatching = DiskReadingNotifier::new(FileCheckpointStore::new(&path));
    let first = WatcherService::load(
        config(),
        Arc::clone(&ledger) as Arc<dyn LedgerReader>,
        Arc::new(FileCheckpointStore::new(&path)),
        Arc::clone(&dispatching) as Arc<dyn Notifier>,
    )
    .await
    .expect("service");
    first.run_cycle().await.expect("init");

    ledger.push(swap(120, 0, 2 * ONE_BASE, 10 * ONE_QUOTE));
    first.run_cycle().await.expect("commit");
    drop(first);

    // The single send saw the new height and totals already durable.
    let on_disk = dispatching.on_disk.lock().await.clone();
    assert_eq!(on_disk.len(), 1);
    assert_eq!(on_disk[0].last_processed_height, Some(150));
    assert_eq!(on_disk[0].totals.base_sum(), Accumulator::from(2 * ONE_BASE));
    assert_eq!(on_disk[0].totals.quote_sum(), Accumulator::from(10 * ONE_QUOTE));

    // Restarting from that file neither re-reads the range nor re-counts the swap.
    let notifier = Arc::new(RecordingNotifier::default());
    let second = start(&ledger, Arc::new(FileCheckpointStore::new(&path)), &notifier).await;
    assert_eq!(second.snapshot(), on_disk[0]);

    let outcome = second.run_cycle().await.expect("cycle");
    assert_eq!(outcome, CycleOutcome::Empty { from: 151, to: 150 });
    assert_eq!(second.snapshot().totals, on_disk[0].totals);
    assert_eq!(ledger.event_reads(), vec![(51, 150)]);
    assert_eq!(notifier.attempts(), 0);
}

#[tokio::test]
async fn test_notifier_failure_is_isolated() {
    let ledger = ScriptedLedger::at(150);
    let notifier = RecordingNotifier::failing_on(ChannelKey::Swap);
    let service = start(&ledger, Arc::new(MemoryCheckpointStore::new()), &notifier).await;
    service.run_cycle().await.expect("init");

    ledger.push(listing(80, 0));
    ledger.push(swap(80, 1, ONE_BASE, 5 * ONE_QUOTE));
    ledger.push(offer(81, 0));

    let CycleOutcome::Committed(report) = service.run_cycle().await.expect("cycle") else {
        panic!("expected commit");
    };

    assert_eq!(report.events, 3);
    assert_eq!(report.notified, 2);
    assert_eq!(report.notify_failed, 1);
    assert_eq!(service.snapshot().last_processed_height, Some(150));
    assert_eq!(
        service.snapshot().totals.base_sum(),
        Accumulator::from(ONE_BASE)
    );

    let channels: Vec<ChannelKey> = notifier.delivered().iter().map(|(c, _)| *c).collect();
    assert_eq!(channels, vec![ChannelKey::Listing, ChannelKey::Offer]);

    // The failed message is not retried.
    let outcome = service.run_cycle().await.expect("cycle");
    assert!(matches!(outcome, CycleOutcome::Empty { .. }));
    assert_eq!(notifier.attempts(), 3);
}

#[tokio::test]
async fn test_listing_and_offer_do_not_feed_totals() {
    let ledger = ScriptedLedger::at(150);
    let notifier = Arc::new(RecordingNotifier::default());
    let service = start(&ledger, Arc::new(MemoryCheckpointStore::new()), &notifier).await;
    service.run_cycle().await.expect("init");

    ledger.push(listing(60, 0));
    ledger.push(offer(61, 0));
    service.run_cycle().await.expect("cycle");

    assert!(service.snapshot().totals.is_empty());
    assert_eq!(notifier.delivered().len(), 2);
    assert_eq!(
        service.status().activity_text(),
        "Monitoring VTRU/USDC swaps"
    );
}

#[tokio::test]
async fn test_overlapping_cycle_is_dropped() {
    let ledger = ScriptedLedger::at(150);
    ledger.height_delay_ms.store(50, Ordering::SeqCst);
    let notifier = Arc::new(RecordingNotifier::default());
    let service = start(&ledger, Arc::new(MemoryCheckpointStore::new()), &notifier).await;

    let (first, second) = tokio::join!(service.run_cycle(), service.run_cycle());

    assert_eq!(first.expect("first"), CycleOutcome::Initialized { height: 50 });
    assert_eq!(second.expect("second"), CycleOutcome::Skipped);
    assert_eq!(service.metrics().cycles_skipped(), 1);
    assert_eq!(service.metrics().poll_cycles(), 1);
}

#[tokio::test]
async fn test_height_never_decreases() {
    let ledger = ScriptedLedger::at(150);
    let notifier = Arc::new(RecordingNotifier::default());
    let service = start(&ledger, Arc::new(MemoryCheckpointStore::new()), &notifier).await;

    let mut heights = Vec::new();
    for tip in [150, 150, 160, 155, 170, 170, 140, 200] {
        ledger.set_height(tip);
        service.run_cycle().await.expect("cycle");
        heights.push(
            service
                .snapshot()
                .last_processed_height
                .expect("initialized"),
        );
    }

    assert_eq!(heights, vec![50, 150, 160, 160, 170, 170, 170, 200]);
    assert!(heights.windows(2).all(|w| w[0] <= w[1]));

    // Every height after the initial one was fetched exactly once.
    assert_eq!(
        ledger.event_reads(),
        vec![(51, 150), (151, 160), (161, 170), (171, 200)]
    );
}
