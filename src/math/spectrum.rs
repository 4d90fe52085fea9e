//! Discrete Fourier spectrum helpers for seeding the sinusoid fit.
//!
//! Frequencies follow the conventional FFT bin layout: bin `k` of an `n`-point
//! transform with sample spacing `d` has frequency `k / (n·d)` for the lower
//! half and `(k − n) / (n·d)` for the upper (negative-frequency) half.

use rustfft::{FftPlanner, num_complex::Complex};

/// Magnitudes `|X_k|` of the forward DFT of a real signal.
pub fn fft_magnitudes(signal: &[f64]) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }

    let mut buffer: Vec<Complex<f64>> = signal.iter().map(|&v| Complex::new(v, 0.0)).collect();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(buffer.len());
    fft.process(&mut buffer);

    buffer.iter().map(|c| c.norm()).collect()
}

/// Frequency of each FFT bin for `n` samples spaced `spacing` apart.
pub fn fft_frequencies(n: usize, spacing: f64) -> Vec<f64> {
    let scale = 1.0 / (n as f64 * spacing);
    let positive = (n.saturating_sub(1)) / 2 + 1;
    (0..n)
        .map(|k| {
            if k < positive {
                k as f64 * scale
            } else {
                (k as f64 - n as f64) * scale
            }
        })
        .collect()
}

/// Absolute frequency of the strongest non-DC bin.
///
/// Ties go to the lowest bin. Returns `None` for fewer than two samples or a
/// non-positive spacing.
pub fn dominant_frequency(signal: &[f64], spacing: f64) -> Option<f64> {
    let n = signal.len();
    if n < 2 || !(spacing.is_finite() && spacing > 0.0) {
        return None;
    }

    let magnitudes = fft_magnitudes(signal);
    let freqs = fft_frequencies(n, spacing);

    let mut best = 1;
    for k in 2..n {
        if magnitudes[k] > magnitudes[best] {
            best = k;
        }
    }

    Some(freqs[best].abs())
}
