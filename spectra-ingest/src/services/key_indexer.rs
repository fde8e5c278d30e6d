//! Single writer of the key index record
//!
//! Workers never touch the index record. They hand each newly stored key to
//! the [`KeyIndexer`] over a bounded channel, and the indexer applies one
//! read-modify-write transaction per key in arrival order. The indexer keeps
//! going until it has been told to stop and every queued key is applied.

use crate::error::{IngestError, Result};
use crate::models::{FingerprintKey, KeyIndex, KEY_INDEX_KEY};
use spectra_common::config::CorruptIndexPolicy;
use spectra_common::Store;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Result of applying one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Added,
    AlreadyPresent,
}

/// Counts for one indexer lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexerReport {
    /// Keys appended to the index
    pub indexed: usize,
    /// Keys that were already listed
    pub already_present: usize,
    /// Keys left unindexed after an error
    pub failures: usize,
}

/// Consumer that owns the key index record
pub struct KeyIndexer {
    store: Arc<dyn Store>,
    keys: mpsc::Receiver<FingerprintKey>,
    stop: CancellationToken,
    policy: CorruptIndexPolicy,
}

impl KeyIndexer {
    pub fn new(
        store: Arc<dyn Store>,
        keys: mpsc::Receiver<FingerprintKey>,
        stop: CancellationToken,
        policy: CorruptIndexPolicy,
    ) -> Self {
        Self {
            store,
            keys,
            stop,
            policy,
        }
    }

    /// Apply keys until stopped, then drain whatever is still queued
    pub async fn run(mut self) -> IndexerReport {
        let mut report = IndexerReport::default();

        loop {
            let next = tokio::select! {
                biased;
                key = self.keys.recv() => key,
                _ = self.stop.cancelled() => None,
            };

            match next {
                Some(key) => self.apply(key, &mut report).await,
                None => break,
            }
        }

        // No new keys after this; queued ones are still delivered
        self.keys.close();
        while let Some(key) = self.keys.recv().await {
            self.apply(key, &mut report).await;
        }

        tracing::debug!(
            indexed = report.indexed,
            already_present = report.already_present,
            failures = report.failures,
            "Key indexer finished"
        );

        report
    }

    async fn apply(&self, key: FingerprintKey, report: &mut IndexerReport) {
        match self.append_key(&key).await {
            Ok(AppendOutcome::Added) => {
                tracing::debug!(key = %key, "Key indexed");
                report.indexed += 1;
            }
            Ok(AppendOutcome::AlreadyPresent) => {
                tracing::debug!(key = %key, "Key already indexed");
                report.already_present += 1;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Key left unindexed");
                report.failures += 1;
            }
        }
    }

    /// Read the index, append `key`, write it back in one transaction
    pub async fn append_key(&self, key: &FingerprintKey) -> Result<AppendOutcome> {
        let mut tx = self.store.begin().await?;

        let mut index = match tx.get(KEY_INDEX_KEY).await? {
            None => KeyIndex::default(),
            Some(bytes) => match KeyIndex::from_bytes(&bytes) {
                Ok(index) => index,
                Err(e) => match self.policy {
                    CorruptIndexPolicy::Reset => {
                        tracing::warn!(
                            error = %e,
                            "Key index record is unreadable, starting a new index"
                        );
                        KeyIndex::default()
                    }
                    CorruptIndexPolicy::Preserve => {
                        tx.discard().await?;
                        return Err(IngestError::CorruptIndex(e.to_string()));
                    }
                },
            },
        };

        if !index.insert(key.clone()) {
            tx.discard().await?;
            return Ok(AppendOutcome::AlreadyPresent);
        }

        tx.put(KEY_INDEX_KEY, &index.to_bytes()?).await?;
        tx.commit().await.map_err(|source| IngestError::Commit {
            key: KEY_INDEX_KEY.to_string(),
            source,
        })?;

        Ok(AppendOutcome::Added)
    }
}
