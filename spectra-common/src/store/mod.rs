//! Transactional key-value store contract
//!
//! Fingerprint records and the key index live in a single flat keyspace of
//! UTF-8 keys mapped to opaque byte values. Any engine that satisfies
//! [`Store`] can back an ingest run:
//!
//! - [`SqliteStore`]: durable engine on a single SQLite file (default)
//! - [`MemoryStore`]: process-local engine for tests and dry runs
//!
//! Both engines are safe to share between tasks. Transactions are atomic,
//! observe their own uncommitted writes, and are discarded when dropped
//! without a commit.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::Result;
use async_trait::async_trait;

/// Shared handle to a key-value engine
#[async_trait]
pub trait Store: Send + Sync {
    /// Check whether a committed record exists under `key`
    async fn has(&self, key: &str) -> Result<bool>;

    /// Read the committed record under `key`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Open a write transaction
    ///
    /// Engines may serialize transactions; callers should keep them short.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;
}

/// Atomic unit of reads and writes against a [`Store`]
#[async_trait]
pub trait StoreTransaction: Send {
    /// Check whether `key` exists, including writes staged in this transaction
    async fn has(&mut self, key: &str) -> Result<bool>;

    /// Read `key`, including writes staged in this transaction
    async fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stage a write of `value` under `key`
    async fn put(&mut self, key: &str, value: &[u8]) -> Result<()>;

    /// Apply every staged write atomically
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Drop every staged write
    async fn discard(self: Box<Self>) -> Result<()>;
}
