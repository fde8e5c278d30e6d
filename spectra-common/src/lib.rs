//! # Spectra Common Library
//!
//! Shared code for the spectra fingerprint tools:
//! - Error type shared by every crate in the workspace
//! - Configuration loading (TOML file, environment, compiled defaults)
//! - The transactional key-value `Store` contract and its engines

pub mod config;
pub mod error;
pub mod store;

pub use error::{Error, Result};
pub use store::{MemoryStore, SqliteStore, Store, StoreTransaction};
