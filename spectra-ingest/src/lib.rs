//! spectra-ingest library interface
//!
//! Batch spectral fingerprinting of a sounds directory:
//! - `models`: fingerprint records, keys, the key index and work items
//! - `services`: fingerprint computation, work dispatch, directory listing,
//!   the worker pool and the key indexer
//! - `utils`: audio decoding and downmixing

pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{IngestError, Result, Severity};
