//! # Fast Fourier Transform (FFT) Module
//!
//! Turns the rolling audio window into a magnitude spectrum.
//!
//! ## Features
//! - FFT planned once per window size with RustFFT and reused every cycle
//! - Magnitudes for the non-negative half of the spectrum only
//! - Mains hum suppression by zeroing the lowest bins
//!
//! The samples are transformed as-is, without a window function or DC
//! removal, so the magnitudes stay on the scale the noise threshold is
//! calibrated against.

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::sync::Arc;

/// A forward FFT of fixed length with its own scratch buffers.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("len", &self.buffer.len())
            .finish()
    }
}

impl SpectrumAnalyzer {
    /// Plans a forward FFT for windows of `window_size` samples.
    pub fn new(window_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(window_size);
        let scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];
        Self {
            fft,
            buffer: vec![Complex::default(); window_size],
            scratch,
        }
    }

    pub fn window_size(&self) -> usize {
        self.buffer.len()
    }

    /// Computes the magnitude spectrum of `signal`.
    ///
    /// The result has `window_size / 2` bins; the upper half of a real
    /// signal's spectrum mirrors the lower half and is dropped.
    ///
    /// # Panics
    /// * If `signal.len()` differs from the planned window size
    pub fn magnitudes(&mut self, signal: &[f32]) -> Vec<f32> {
        assert_eq!(
            signal.len(),
            self.buffer.len(),
            "Input frame size must match the planned window size"
        );

        for (slot, &sample) in self.buffer.iter_mut().zip(signal) {
            *slot = Complex { re: sample, im: 0.0 };
        }
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        spectrum_to_magnitudes(&self.buffer)
    }
}

/// Extracts the magnitudes of the first half of a complex spectrum.
pub fn spectrum_to_magnitudes(spectrum: &[Complex<f32>]) -> Vec<f32> {
    spectrum
        .iter()
        .take(spectrum.len() / 2)
        .map(|c| c.norm()) // .norm() is sqrt(re^2 + im^2)
        .collect()
}

/// Zeroes every bin below `cutoff_hz`.
///
/// The number of cleared bins is `floor(cutoff_hz / bin_width)`, so the bin
/// that contains the cutoff itself survives.
pub fn suppress_hum(magnitudes: &mut [f32], cutoff_hz: f32, bin_width: f32) {
    if bin_width <= 0.0 {
        return;
    }
    let cleared = ((cutoff_hz / bin_width) as usize).min(magnitudes.len());
    magnitudes[..cleared].fill(0.0);
}
