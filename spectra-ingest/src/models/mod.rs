//! Data models for spectra-ingest

pub mod fingerprint;
pub mod work_item;

pub use fingerprint::{Fingerprint, FingerprintChunk, FingerprintKey, KeyIndex, KEY_INDEX_KEY};
pub use work_item::WorkItem;
