//! Audio Decoding Utilities
//!
//! **Purpose:** Decode audio files to normalized, channel-interleaved samples
//! for fingerprinting, then reduce them to mono.
//!
//! Uses symphonia for format-agnostic decoding (WAV, MP3, FLAC, OGG, etc.)

use spectra_common::config::DownmixMode;
use std::path::{Path, PathBuf};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, SampleBuffer, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use thiserror::Error;

/// Audio decoding errors
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to open audio file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unsupported or unreadable format: {0}")]
    Probe(String),

    #[error("No audio track found in file")]
    NoTrack,

    #[error("Channel count unknown")]
    UnknownChannels,

    #[error("Failed to create decoder: {0}")]
    Codec(String),

    #[error("Error reading packet: {0}")]
    Packet(String),
}

/// Interleaved samples in the encoding the container delivered
///
/// Every variant has exactly one normalization into `f64` amplitudes.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSamples {
    /// Narrow unsigned integer samples, silence at 128
    U8(Vec<u8>),
    /// Wide signed integer samples, silence at 0
    I16(Vec<i16>),
    /// Floating point samples, nominal range [-1.0, 1.0]
    F32(Vec<f32>),
}

impl RawSamples {
    pub fn len(&self) -> usize {
        match self {
            RawSamples::U8(v) => v.len(),
            RawSamples::I16(v) => v.len(),
            RawSamples::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert to normalized `f64` amplitudes
    pub fn normalize(&self) -> Vec<f64> {
        match self {
            RawSamples::U8(v) => v.iter().copied().map(normalize_u8).collect(),
            RawSamples::I16(v) => v.iter().copied().map(normalize_i16).collect(),
            RawSamples::F32(v) => v.iter().copied().map(normalize_f32).collect(),
        }
    }

    /// Append another block, promoting to `F32` if the encodings differ
    fn extend(&mut self, other: RawSamples) {
        let current = std::mem::replace(self, RawSamples::F32(Vec::new()));
        *self = match (current, other) {
            (RawSamples::U8(mut a), RawSamples::U8(b)) => {
                a.extend(b);
                RawSamples::U8(a)
            }
            (RawSamples::I16(mut a), RawSamples::I16(b)) => {
                a.extend(b);
                RawSamples::I16(a)
            }
            (RawSamples::F32(mut a), RawSamples::F32(b)) => {
                a.extend(b);
                RawSamples::F32(a)
            }
            (current, other) => RawSamples::F32(
                current
                    .normalize()
                    .into_iter()
                    .chain(other.normalize())
                    .map(|v| v as f32)
                    .collect(),
            ),
        };
    }
}

/// `u8` sample to [-1.0, 1.0)
pub fn normalize_u8(sample: u8) -> f64 {
    (f64::from(sample) - 128.0) / 128.0
}

/// `i16` sample to [-1.0, 1.0)
pub fn normalize_i16(sample: i16) -> f64 {
    f64::from(sample) / 32768.0
}

/// `f32` sample, unchanged
pub fn normalize_f32(sample: f32) -> f64 {
    f64::from(sample)
}

/// Decoded audio result
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Channel-interleaved normalized samples
    pub samples: Vec<f64>,
    /// Channel count
    pub channels: usize,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn new(raw: RawSamples, channels: usize, sample_rate: u32) -> Self {
        Self {
            samples: raw.normalize(),
            channels,
            sample_rate,
        }
    }

    /// Samples per channel
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels
    }

    /// Reduce to a single channel
    pub fn to_mono(&self, mode: DownmixMode) -> Vec<f64> {
        downmix(&self.samples, self.channels, mode)
    }
}

/// Reduce interleaved samples to one channel
///
/// A trailing partial frame is dropped.
pub fn downmix(samples: &[f64], channels: usize, mode: DownmixMode) -> Vec<f64> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let frames = samples.chunks_exact(channels);
    match mode {
        DownmixMode::Average => frames
            .map(|frame| frame.iter().sum::<f64>() / channels as f64)
            .collect(),
        DownmixMode::FirstChannel => frames.map(|frame| frame[0]).collect(),
    }
}

/// Source of decoded audio
///
/// Implementations are called from blocking worker threads.
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<DecodedAudio, DecodeError>;
}

/// Decoder for every container and codec symphonia supports
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedAudio, DecodeError> {
        decode_audio_file(path)
    }
}

/// Decode an audio file to normalized interleaved samples
///
/// **Algorithm:**
/// 1. Open file and probe format using symphonia
/// 2. Find default audio track
/// 3. Create decoder for track codec
/// 4. Decode all packets, keeping the sample encoding when it is u8, i16 or f32
/// 5. Normalize once at the end
pub fn decode_audio_file(file_path: &Path) -> Result<DecodedAudio, DecodeError> {
    tracing::debug!(path = %file_path.display(), "Decoding audio file");

    let file = std::fs::File::open(file_path).map_err(|source| DecodeError::Open {
        path: file_path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create format hint from file extension
    let mut hint = Hint::new();
    if let Some(extension) = file_path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DecodeError::Probe(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;

    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channel_count = track.codec_params.channels.map(|c| c.count());

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::Codec(e.to_string()))?;

    let mut raw: Option<RawSamples> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                // End of stream
                break;
            }
            Err(e) => return Err(DecodeError::Packet(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                tracing::warn!(path = %file_path.display(), error = %e, "Skipping corrupt packet");
                continue;
            }
            Err(e) => return Err(DecodeError::Packet(e.to_string())),
        };

        channel_count.get_or_insert(decoded.spec().channels.count());

        let block = interleave_ref(decoded);
        match raw.as_mut() {
            Some(samples) => samples.extend(block),
            None => raw = Some(block),
        }
    }

    let channels = channel_count.ok_or(DecodeError::UnknownChannels)?;
    let raw = raw.unwrap_or(RawSamples::F32(Vec::new()));
    let total_samples = raw.len();
    let audio = DecodedAudio::new(raw, channels, sample_rate);

    tracing::debug!(
        path = %file_path.display(),
        sample_rate,
        channels,
        total_samples,
        frames = audio.frames(),
        "Audio decoding complete"
    );

    Ok(audio)
}

/// Interleave one decoded buffer, preserving u8/i16/f32 encodings
fn interleave_ref(decoded: AudioBufferRef<'_>) -> RawSamples {
    match &decoded {
        AudioBufferRef::U8(buf) => return RawSamples::U8(interleave::<u8>(buf)),
        AudioBufferRef::S16(buf) => return RawSamples::I16(interleave::<i16>(buf)),
        AudioBufferRef::F32(buf) => return RawSamples::F32(interleave::<f32>(buf)),
        _ => {}
    }

    // Remaining encodings go through symphonia's own f32 conversion
    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
    buffer.copy_interleaved_ref(decoded);
    RawSamples::F32(buffer.samples().to_vec())
}

fn interleave<S: Sample>(buf: &AudioBuffer<S>) -> Vec<S> {
    let channels = buf.spec().channels.count();
    let frames = buf.frames();
    let mut out = Vec::with_capacity(channels * frames);

    for frame_idx in 0..frames {
        for ch in 0..channels {
            out.push(buf.chan(ch)[frame_idx]);
        }
    }

    out
}
