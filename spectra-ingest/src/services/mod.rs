//! Ingest services

pub mod file_scanner;
pub mod fingerprinter;
pub mod ingest_pool;
pub mod key_indexer;
pub mod work_queue;

pub use file_scanner::{FileScanner, ScanError};
pub use fingerprinter::{compute_fingerprint, FingerprintError, Fingerprinter};
pub use ingest_pool::{IngestConfig, IngestPool, ItemOutcome, RunSummary};
pub use key_indexer::{AppendOutcome, IndexerReport, KeyIndexer};
pub use work_queue::WorkQueue;
