//! Spectral fingerprint computation
//!
//! Turns a mono signal into one quantized magnitude spectrum per
//! non-overlapping window:
//!
//! 1. Split into `window_size` windows; the last window keeps the remainder
//!    (no zero padding)
//! 2. FFT each window and take bin magnitudes
//! 3. Scale magnitude bin `i` by Hamming weight `w[L/2 + i]` (second half of
//!    the window function, applied in the frequency domain)
//! 4. Keep bins `[1, L/2)`, dropping DC and the mirrored half
//! 5. Keep every 2nd bin
//! 6. Quantize to `i32` at a fixed scale of 1e6, truncating toward zero

use crate::models::{Fingerprint, FingerprintChunk};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f64::consts::PI;
use thiserror::Error;

/// Fixed-point scale applied before truncation to `i32`
pub const QUANTIZE_SCALE: f64 = 1_000_000.0;

/// Keep one of every `DROP_RATE` retained bins
pub const DROP_RATE: usize = 2;

/// Fingerprinting errors
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("Window size must be at least 1")]
    ZeroWindow,
}

/// Fingerprint generator for one window size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprinter {
    window_size: usize,
}

impl Fingerprinter {
    /// Create a fingerprinter with `window_size` samples per window
    pub fn new(window_size: usize) -> Result<Self, FingerprintError> {
        if window_size == 0 {
            return Err(FingerprintError::ZeroWindow);
        }
        Ok(Self { window_size })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Fingerprint a mono signal
    ///
    /// Produces exactly `ceil(samples.len() / window_size)` chunks.
    pub fn fingerprint(&self, samples: &[f64]) -> Fingerprint {
        let mut planner = FftPlanner::<f64>::new();
        let full_taper = hamming(self.window_size);

        let chunks = samples
            .chunks(self.window_size)
            .map(|window| {
                let fft = planner.plan_fft_forward(window.len());
                let mut buffer: Vec<Complex<f64>> =
                    window.iter().map(|&v| Complex::new(v, 0.0)).collect();
                fft.process(&mut buffer);

                let magnitudes: Vec<f64> = buffer.iter().map(|c| c.norm()).collect();
                if window.len() == self.window_size {
                    spectrum_chunk(&magnitudes, &full_taper)
                } else {
                    spectrum_chunk(&magnitudes, &hamming(window.len()))
                }
            })
            .collect();

        Fingerprint::new(chunks)
    }
}

/// Compute the fingerprint of `samples` at `window_size`
pub fn compute_fingerprint(
    samples: &[f64],
    window_size: usize,
) -> Result<Fingerprint, FingerprintError> {
    Ok(Fingerprinter::new(window_size)?.fingerprint(samples))
}

/// Taper, band-limit, downsample and quantize one magnitude spectrum
///
/// `taper` is the full-length Hamming window for this spectrum.
fn spectrum_chunk(magnitudes: &[f64], taper: &[f64]) -> FingerprintChunk {
    let len = magnitudes.len();
    let half = len / 2;
    if half <= 1 {
        return Vec::new();
    }

    let band: Vec<f64> = magnitudes[1..half]
        .iter()
        .zip(&taper[half + 1..])
        .map(|(m, w)| m * w)
        .collect();

    pack_to_i32(&band, DROP_RATE)
}

/// Hamming window of `len` points
///
/// `w[i] = 0.54 - 0.46 * cos(2πi / (len - 1))`; a single point is `[1.0]`.
pub fn hamming(len: usize) -> Vec<f64> {
    if len == 1 {
        return vec![1.0];
    }
    let denom = (len - 1) as f64;
    (0..len)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / denom).cos())
        .collect()
}

/// Keep every `drop_rate`-th value and quantize it
///
/// Truncates toward zero; values outside the `i32` range saturate.
fn pack_to_i32(values: &[f64], drop_rate: usize) -> Vec<i32> {
    values
        .iter()
        .step_by(drop_rate)
        .map(|v| (v * QUANTIZE_SCALE) as i32)
        .collect()
}
