//! Error types for spectra-ingest

use crate::services::fingerprinter::FingerprintError;
use crate::utils::audio_decoder::DecodeError;
use thiserror::Error;

/// Result type for ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// How the worker loop reacts to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Log and move on to the next item
    Recoverable,
    /// Stop the worker
    Fatal,
}

/// Errors raised while ingesting one item
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to decode {file}: {source}")]
    Decode {
        file: String,
        #[source]
        source: DecodeError,
    },

    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("Store error: {0}")]
    Store(#[from] spectra_common::Error),

    #[error("Commit of {key} failed: {source}")]
    Commit {
        key: String,
        #[source]
        source: spectra_common::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored key index could not be decoded and was left in place
    #[error("Key index record is corrupt: {0}")]
    CorruptIndex(String),

    /// Blocking task panicked or was cancelled
    #[error("Task failed: {0}")]
    Task(String),

    /// Key channel closed before the key could be handed to the indexer
    #[error("Key indexer stopped before receiving {0}")]
    IndexerGone(String),
}

impl IngestError {
    pub fn severity(&self) -> Severity {
        match self {
            IngestError::Fingerprint(FingerprintError::ZeroWindow) => Severity::Fatal,
            IngestError::IndexerGone(_) => Severity::Fatal,
            _ => Severity::Recoverable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_file_errors_are_recoverable() {
        let decode = IngestError::Decode {
            file: "broken.wav".to_string(),
            source: DecodeError::NoTrack,
        };
        assert_eq!(decode.severity(), Severity::Recoverable);

        let commit = IngestError::Commit {
            key: "1024:broken.wav".to_string(),
            source: spectra_common::Error::Config("locked".to_string()),
        };
        assert_eq!(commit.severity(), Severity::Recoverable);
        assert_eq!(
            IngestError::CorruptIndex("expected array".to_string()).severity(),
            Severity::Recoverable
        );
    }

    #[test]
    fn test_setup_errors_are_fatal() {
        assert_eq!(
            IngestError::Fingerprint(FingerprintError::ZeroWindow).severity(),
            Severity::Fatal
        );
        assert_eq!(
            IngestError::IndexerGone("1024:a.wav".to_string()).severity(),
            Severity::Fatal
        );
    }

    #[test]
    fn test_decode_message_names_file() {
        let err = IngestError::Decode {
            file: "notes.txt".to_string(),
            source: DecodeError::Probe("unsupported".to_string()),
        };
        assert!(err.to_string().contains("notes.txt"));
    }
}
