//! Parallel fingerprint ingest
//!
//! **Flow:**
//! 1. Every listed entry goes into one [`WorkQueue`]
//! 2. `workers` tasks pull items until the queue is exhausted
//! 3. Per file: skip if its key is stored, otherwise decode, downmix and
//!    fingerprint on a blocking thread, then store in one transaction
//! 4. Each stored key is pushed to the [`KeyIndexer`]; a full channel holds the
//!    worker back until the indexer catches up
//! 5. Once every worker has exited the indexer is stopped, drains its channel
//!    and the run summary is returned

use crate::error::{IngestError, Result, Severity};
use crate::models::{Fingerprint, FingerprintKey, WorkItem};
use crate::services::fingerprinter::Fingerprinter;
use crate::services::key_indexer::{IndexerReport, KeyIndexer};
use crate::services::work_queue::WorkQueue;
use crate::utils::audio_decoder::AudioDecoder;
use chrono::{DateTime, Utc};
use spectra_common::config::{CorruptIndexPolicy, DownmixMode, Settings, TomlConfig};
use spectra_common::Store;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;
use uuid::Uuid;

/// Parameters of one ingest run
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub window_size: usize,
    pub workers: usize,
    pub index_channel_capacity: usize,
    pub downmix: DownmixMode,
    pub corrupt_index: CorruptIndexPolicy,
}

impl From<&Settings> for IngestConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            window_size: settings.window_size,
            workers: settings.workers,
            index_channel_capacity: settings.index_channel_capacity,
            downmix: settings.downmix,
            corrupt_index: settings.corrupt_index,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self::from(&Settings::from_toml(TomlConfig::default()))
    }
}

/// What a worker did with one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Fingerprint computed, stored and sent for indexing
    Stored,
    /// Key already present in the store
    AlreadyStored,
    /// Entry is a directory
    Directory,
}

/// Counts shared by all workers of a run
#[derive(Debug, Default)]
struct RunCounters {
    stored: AtomicUsize,
    already_stored: AtomicUsize,
    directories: AtomicUsize,
    failed: AtomicUsize,
    stopped_workers: AtomicUsize,
}

impl RunCounters {
    fn record(&self, outcome: ItemOutcome) {
        let counter = match outcome {
            ItemOutcome::Stored => &self.stored,
            ItemOutcome::AlreadyStored => &self.already_stored,
            ItemOutcome::Directory => &self.directories,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a per-item error: recoverable ones as failed files, fatal ones
    /// as stopped workers
    fn record_error(&self, severity: Severity) {
        let counter = match severity {
            Severity::Recoverable => &self.failed,
            Severity::Fatal => &self.stopped_workers,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// Entries listed
    pub items: usize,
    pub stored: usize,
    pub already_stored: usize,
    pub directories: usize,
    /// Files skipped after a recoverable error
    pub failed: usize,
    /// Workers that exited early on a fatal error; the item that stopped a
    /// worker is not counted in `failed`
    pub stopped_workers: usize,
    pub index: IndexerReport,
}

impl RunSummary {
    /// Log the summary at info level
    pub fn log(&self) {
        tracing::info!(
            run_id = %self.run_id,
            started_at = %self.started_at.to_rfc3339(),
            finished_at = %self.finished_at.to_rfc3339(),
            elapsed_ms = self.elapsed.as_millis() as u64,
            items = self.items,
            stored = self.stored,
            skipped = self.already_stored,
            directories = self.directories,
            failed = self.failed,
            indexed = self.index.indexed,
            index_failures = self.index.failures,
            "Ingest run complete"
        );
        if self.stopped_workers > 0 {
            tracing::error!(
                run_id = %self.run_id,
                stopped_workers = self.stopped_workers,
                "Workers stopped on fatal errors"
            );
        }
    }
}

/// Worker pool that fingerprints a batch of files into a store
pub struct IngestPool {
    store: Arc<dyn Store>,
    decoder: Arc<dyn AudioDecoder>,
    config: IngestConfig,
}

impl IngestPool {
    pub fn new(store: Arc<dyn Store>, decoder: Arc<dyn AudioDecoder>, config: IngestConfig) -> Self {
        Self {
            store,
            decoder,
            config,
        }
    }

    /// Process every item once
    ///
    /// Only configuration errors fail the run; per-file errors are logged and
    /// counted in the summary.
    pub async fn run(&self, items: Vec<WorkItem>) -> Result<RunSummary> {
        let fingerprinter = Fingerprinter::new(self.config.window_size)?;
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("ingest_run", run_id = %run_id);

        Ok(self.execute(run_id, fingerprinter, items).instrument(span).await)
    }

    async fn execute(
        &self,
        run_id: Uuid,
        fingerprinter: Fingerprinter,
        items: Vec<WorkItem>,
    ) -> RunSummary {
        let started_at = Utc::now();
        let clock = Instant::now();
        let item_count = items.len();
        let workers = self.config.workers.max(1);

        tracing::info!(
            items = item_count,
            workers,
            window_size = fingerprinter.window_size(),
            "Starting ingest run"
        );

        let queue = Arc::new(WorkQueue::new(items));
        let counters = Arc::new(RunCounters::default());
        let (key_tx, key_rx) = mpsc::channel(self.config.index_channel_capacity.max(1));
        let stop = CancellationToken::new();

        let indexer = KeyIndexer::new(
            Arc::clone(&self.store),
            key_rx,
            stop.clone(),
            self.config.corrupt_index,
        );
        let indexer_handle =
            tokio::spawn(indexer.run().instrument(tracing::info_span!("key_indexer")));

        let tracker = TaskTracker::new();
        for worker_id in 0..workers {
            let worker = Worker {
                id: worker_id,
                queue: Arc::clone(&queue),
                store: Arc::clone(&self.store),
                decoder: Arc::clone(&self.decoder),
                fingerprinter,
                downmix: self.config.downmix,
                keys: key_tx.clone(),
                counters: Arc::clone(&counters),
            };
            tracker.spawn(worker.run().instrument(tracing::info_span!("worker", worker_id)));
        }
        drop(key_tx);

        tracker.close();
        tracker.wait().await;
        tracing::debug!("All workers finished, stopping key indexer");
        stop.cancel();

        let index = match indexer_handle.await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "Key indexer task failed");
                IndexerReport::default()
            }
        };

        RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            elapsed: clock.elapsed(),
            items: item_count,
            stored: counters.stored.load(Ordering::Relaxed),
            already_stored: counters.already_stored.load(Ordering::Relaxed),
            directories: counters.directories.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            stopped_workers: counters.stopped_workers.load(Ordering::Relaxed),
            index,
        }
    }
}

struct Worker {
    id: usize,
    queue: Arc<WorkQueue<WorkItem>>,
    store: Arc<dyn Store>,
    decoder: Arc<dyn AudioDecoder>,
    fingerprinter: Fingerprinter,
    downmix: DownmixMode,
    keys: mpsc::Sender<FingerprintKey>,
    counters: Arc<RunCounters>,
}

impl Worker {
    async fn run(self) {
        let mut processed = 0usize;

        while let Some(item) = self.queue.next() {
            processed += 1;
            tracing::debug!(
                worker_id = self.id,
                file = %item.name(),
                remaining = self.queue.remaining(),
                total = self.queue.len(),
                "Processing file"
            );

            match self.process_item(item).await {
                Ok(outcome) => self.counters.record(outcome),
                Err(e) => {
                    let severity = e.severity();
                    self.counters.record_error(severity);
                    match severity {
                        Severity::Recoverable => {
                            tracing::warn!(
                                worker_id = self.id,
                                file = %item.name(),
                                error = %e,
                                "Skipping file"
                            );
                        }
                        Severity::Fatal => {
                            tracing::error!(
                                worker_id = self.id,
                                file = %item.name(),
                                error = %e,
                                "Worker stopping"
                            );
                            break;
                        }
                    }
                }
            }
        }

        tracing::debug!(worker_id = self.id, processed, "Worker finished");
    }

    async fn process_item(&self, item: &WorkItem) -> Result<ItemOutcome> {
        if item.is_dir() {
            tracing::debug!(file = %item.name(), "Skipping directory");
            return Ok(ItemOutcome::Directory);
        }

        let key = FingerprintKey::new(self.fingerprinter.window_size(), item.name());
        if self.store.has(key.as_str()).await? {
            tracing::debug!(key = %key, "Already fingerprinted");
            return Ok(ItemOutcome::AlreadyStored);
        }

        let fingerprint = self.compute(item).await?;
        let bytes = fingerprint.to_bytes()?;

        let mut tx = self.store.begin().await?;
        tx.put(key.as_str(), &bytes).await?;
        tx.commit().await.map_err(|source| IngestError::Commit {
            key: key.to_string(),
            source,
        })?;

        tracing::info!(
            worker_id = self.id,
            key = %key,
            chunks = fingerprint.len(),
            "Fingerprint stored"
        );

        self.keys
            .send(key)
            .await
            .map_err(|e| IngestError::IndexerGone(e.0.to_string()))?;

        Ok(ItemOutcome::Stored)
    }

    /// Decode, downmix and fingerprint on a blocking thread
    async fn compute(&self, item: &WorkItem) -> Result<Fingerprint> {
        let decoder = Arc::clone(&self.decoder);
        let fingerprinter = self.fingerprinter;
        let downmix = self.downmix;
        let path = item.path();
        let file = item.name().to_string();

        tokio::task::spawn_blocking(move || -> Result<Fingerprint> {
            let audio = decoder
                .decode(&path)
                .map_err(|source| IngestError::Decode { file, source })?;
            let mono = audio.to_mono(downmix);
            Ok(fingerprinter.fingerprint(&mono))
        })
        .await
        .map_err(|e| IngestError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KeyIndex, KEY_INDEX_KEY};
    use crate::utils::audio_decoder::{DecodeError, DecodedAudio, RawSamples};
    use async_trait::async_trait;
    use spectra_common::{MemoryStore, StoreTransaction};
    use std::path::Path;

    /// Produces a short ramp per file; names ending in `.bad` fail
    struct FakeDecoder {
        samples: usize,
    }

    impl AudioDecoder for FakeDecoder {
        fn decode(&self, path: &Path) -> std::result::Result<DecodedAudio, DecodeError> {
            if path.extension().is_some_and(|ext| ext == "bad") {
                return Err(DecodeError::Probe("not audio".to_string()));
            }
            let raw: Vec<f32> = (0..self.samples).map(|i| (i % 64) as f32 / 64.0).collect();
            Ok(DecodedAudio::new(RawSamples::F32(raw), 1, 44100))
        }
    }

    /// Memory store whose transactions open slowly
    struct SlowStore {
        inner: MemoryStore,
        delay: Duration,
    }

    #[async_trait]
    impl Store for SlowStore {
        async fn has(&self, key: &str) -> spectra_common::Result<bool> {
            self.inner.has(key).await
        }

        async fn get(&self, key: &str) -> spectra_common::Result<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn begin(&self) -> spectra_common::Result<Box<dyn StoreTransaction>> {
            tokio::time::sleep(self.delay).await;
            self.inner.begin().await
        }
    }

    fn items(names: &[String]) -> Vec<WorkItem> {
        names
            .iter()
            .map(|name| WorkItem::new("/virtual/sounds", name.as_str(), false))
            .collect()
    }

    fn names(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("sound_{:03}.wav", i)).collect()
    }

    fn config(workers: usize, capacity: usize) -> IngestConfig {
        IngestConfig {
            window_size: 1024,
            workers,
            index_channel_capacity: capacity,
            downmix: DownmixMode::Average,
            corrupt_index: CorruptIndexPolicy::Reset,
        }
    }

    fn pool(store: Arc<dyn Store>, config: IngestConfig) -> IngestPool {
        IngestPool::new(store, Arc::new(FakeDecoder { samples: 3000 }), config)
    }

    async fn index_of(store: &dyn Store) -> KeyIndex {
        let bytes = store.get(KEY_INDEX_KEY).await.unwrap().unwrap();
        KeyIndex::from_bytes(&bytes).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_file_stored_once_for_any_worker_count() {
        for workers in [1, 4, 8] {
            let store = MemoryStore::new();
            let files = names(25);

            let summary = pool(Arc::new(store.clone()), config(workers, 100))
                .run(items(&files))
                .await
                .unwrap();

            assert_eq!(summary.stored, 25, "workers={}", workers);
            assert_eq!(summary.failed, 0);
            assert_eq!(store.keys_with_prefix("1024:").await.len(), 25);
            assert_eq!(index_of(&store).await.len(), 25);

            let bytes = store.get("1024:sound_000.wav").await.unwrap().unwrap();
            assert_eq!(Fingerprint::from_bytes(&bytes).unwrap().len(), 3);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_second_run_recomputes_nothing() {
        let store = MemoryStore::new();
        let files = names(10);

        let first = pool(Arc::new(store.clone()), config(4, 100))
            .run(items(&files))
            .await
            .unwrap();
        let second = pool(Arc::new(store.clone()), config(4, 100))
            .run(items(&files))
            .await
            .unwrap();

        assert_eq!(first.stored, 10);
        assert_eq!(second.stored, 0);
        assert_eq!(second.already_stored, 10);
        assert_eq!(second.index.indexed, 0);
        assert_ne!(first.run_id, second.run_id);
        assert_eq!(index_of(&store).await.len(), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failed_decode_does_not_stop_the_run() {
        let store = MemoryStore::new();
        let mut files = names(5);
        files.push("readme.bad".to_string());
        let mut work = items(&files);
        work.push(WorkItem::new("/virtual/sounds", "nested", true));

        let summary = pool(Arc::new(store.clone()), config(2, 100))
            .run(work)
            .await
            .unwrap();

        assert_eq!(summary.items, 7);
        assert_eq!(summary.stored, 5);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.directories, 1);
        assert_eq!(summary.stopped_workers, 0);
        assert!(!store.has("1024:readme.bad").await.unwrap());
        assert!(!store.has("1024:nested").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_index_converges_under_channel_contention() {
        let store = MemoryStore::new();

        let existing: Vec<String> = (0..7).map(|i| format!("1024:old_{}.wav", i)).collect();
        let seeded = serde_json::to_vec(&existing).unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.put(KEY_INDEX_KEY, &seeded).await.unwrap();
        tx.commit().await.unwrap();

        let slow: Arc<dyn Store> = Arc::new(SlowStore {
            inner: store.clone(),
            delay: Duration::from_millis(5),
        });
        let summary = pool(slow, config(8, 1)).run(items(&names(30))).await.unwrap();

        assert_eq!(summary.stored, 30);
        assert_eq!(summary.index.indexed, 30);

        let index = index_of(&store).await;
        assert_eq!(index.len(), 37);
        for name in names(30) {
            assert!(index.contains(&FingerprintKey::new(1024, &name)));
        }
    }

    #[tokio::test]
    async fn test_zero_window_rejected_before_work() {
        let store = MemoryStore::new();
        let mut bad = config(1, 100);
        bad.window_size = 0;

        let result = pool(Arc::new(store.clone()), bad).run(items(&names(3))).await;
        assert!(matches!(result, Err(IngestError::Fingerprint(_))));
        assert!(store.keys_with_prefix("").await.is_empty());
    }

    #[test]
    fn test_fatal_errors_count_stopped_workers_only() {
        let counters = RunCounters::default();

        counters.record_error(Severity::Recoverable);
        counters.record_error(Severity::Recoverable);
        counters.record_error(Severity::Fatal);

        assert_eq!(counters.failed.load(Ordering::Relaxed), 2);
        assert_eq!(counters.stopped_workers.load(Ordering::Relaxed), 1);

        let fatal = IngestError::IndexerGone("1024:a.wav".to_string());
        counters.record_error(fatal.severity());
        assert_eq!(counters.failed.load(Ordering::Relaxed), 2);
        assert_eq!(counters.stopped_workers.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let store = MemoryStore::new();
        let summary = pool(Arc::new(store.clone()), config(3, 100))
            .run(Vec::new())
            .await
            .unwrap();

        assert_eq!(summary.items, 0);
        assert_eq!(summary.stored, 0);
        assert!(store.get(KEY_INDEX_KEY).await.unwrap().is_none());
    }
}
