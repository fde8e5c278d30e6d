//! Utility modules for spectra-ingest

pub mod audio_decoder;

pub use audio_decoder::{AudioDecoder, DecodeError, DecodedAudio, RawSamples, SymphoniaDecoder};
