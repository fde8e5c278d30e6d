//! Test Helper Utilities
//!
//! Shared utilities for spectra-ingest integration tests

pub mod audio_generator;

pub use audio_generator::{generate_test_library, generate_test_wav, AudioConfig};
