//! # Pitch Detection Module
//!
//! Extracts the dominant frequency from the rolling audio window.
//!
//! The estimate is the strongest bin of the hum-suppressed magnitude
//! spectrum. Windows that are silent or whose strongest peak stays under the
//! noise threshold produce no estimate at all, so ambient noise never reaches
//! the tuning policy.

use crate::config::{AudioConfig, DetectionConfig};
use crate::fft::{self, SpectrumAnalyzer};

/// The dominant frequency of one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    /// Peak bin converted to Hz, truncated to whole hertz.
    pub frequency_hz: u32,
    /// Raw DFT magnitude of the peak bin.
    pub magnitude: f32,
}

/// Result of analysing one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Detection {
    /// Every sample is within the silence floor.
    NoInput,
    /// The strongest peak is weaker than the noise threshold.
    BelowNoise { peak: f32 },
    Pitch(PitchEstimate),
}

impl Detection {
    pub fn estimate(&self) -> Option<PitchEstimate> {
        match self {
            Detection::Pitch(estimate) => Some(*estimate),
            _ => None,
        }
    }
}

/// Spectral estimator bound to a fixed window geometry.
#[derive(Debug)]
pub struct PitchDetector {
    analyzer: SpectrumAnalyzer,
    sample_rate: u32,
    bin_width: f32,
    detection: DetectionConfig,
}

impl PitchDetector {
    pub fn new(audio: &AudioConfig, detection: &DetectionConfig) -> Self {
        Self {
            analyzer: SpectrumAnalyzer::new(audio.window_size),
            sample_rate: audio.sample_rate,
            bin_width: audio.bin_width(),
            detection: detection.clone(),
        }
    }

    /// Analyses a full window and returns the dominant pitch, if any.
    pub fn detect(&mut self, window: &[f32]) -> Detection {
        if is_silent(window, self.detection.silence_floor) {
            return Detection::NoInput;
        }

        let mut magnitudes = self.analyzer.magnitudes(window);
        fft::suppress_hum(&mut magnitudes, self.detection.hum_cutoff_hz, self.bin_width);

        let Some((peak_bin, peak)) = find_peak(&magnitudes) else {
            return Detection::NoInput;
        };
        if peak < self.detection.noise_threshold {
            return Detection::BelowNoise { peak };
        }

        Detection::Pitch(PitchEstimate {
            frequency_hz: bin_to_hz(peak_bin, self.sample_rate, self.analyzer.window_size()),
            magnitude: peak,
        })
    }
}

/// True when no sample rises above `floor` in absolute value.
pub fn is_silent(samples: &[f32], floor: f32) -> bool {
    samples.iter().all(|s| s.abs() <= floor)
}

/// Index and value of the first maximal bin.
pub fn find_peak(magnitudes: &[f32]) -> Option<(usize, f32)> {
    magnitudes
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, m)| match best {
            Some((_, best_m)) if best_m >= m => best,
            _ => Some((i, m)),
        })
}

/// Converts a bin index to whole hertz, truncating the fraction.
pub fn bin_to_hz(bin: usize, sample_rate: u32, window_size: usize) -> u32 {
    (bin as f64 * sample_rate as f64 / window_size as f64) as u32
}
