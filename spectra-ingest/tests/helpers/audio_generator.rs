//! Audio Test Fixture Generator
//!
//! Writes 16-bit PCM WAV fixtures containing a single sine tone

use std::path::{Path, PathBuf};

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Samples per channel
    pub frames: usize,
    pub sample_rate: u32,
    pub channels: u16,
    pub frequency: f64,
    /// Write the tone to the first channel only, silence elsewhere
    pub first_channel_only: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            frames: 44100,
            sample_rate: 44100,
            channels: 1,
            frequency: 440.0,
            first_channel_only: false,
        }
    }
}

/// Generate a test WAV file with specified configuration
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;

    for i in 0..config.frames {
        // Tone at 50% amplitude
        let t = i as f64 / config.sample_rate as f64;
        let sample =
            (0.5 * (2.0 * std::f64::consts::PI * config.frequency * t).sin() * i16::MAX as f64) as i16;

        for channel in 0..config.channels {
            if channel > 0 && config.first_channel_only {
                writer.write_sample(0i16)?;
            } else {
                writer.write_sample(sample)?;
            }
        }
    }

    writer.finalize()?;
    Ok(path.to_path_buf())
}

/// Generate `count` WAV files named `test_track_001.wav`, `test_track_002.wav`, ...
pub fn generate_test_library(
    dir: &Path,
    count: usize,
    config: &AudioConfig,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for i in 0..count {
        let filename = format!("test_track_{:03}.wav", i + 1);
        let file_path = dir.join(filename);
        generate_test_wav(&file_path, config)?;
        files.push(file_path);
    }

    Ok(files)
}
