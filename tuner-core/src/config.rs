//! # Configuration Module
//!
//! Every tunable constant of the tuner lives here: audio window geometry,
//! noise and hum suppression, the per-string target table, the actuator link
//! and the notifier commands. The configuration is stored as JSON and any
//! field missing from the file falls back to the built-in defaults, which
//! describe a six-string guitar in standard tuning.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, TunerError};

/// Complete tuner configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub audio: AudioConfig,
    pub detection: DetectionConfig,
    pub tuning: TuningConfig,
    pub actuator: ActuatorConfig,
    pub notifier: NotifierConfig,
}

/// Audio window geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Length of the DFT window in samples.
    pub window_size: usize,
    /// Number of new samples delivered per processing cycle.
    pub window_step: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            window_size: 44_100,
            window_step: 21_050,
        }
    }
}

impl AudioConfig {
    /// Width of one spectrum bin in Hz.
    pub fn bin_width(&self) -> f32 {
        self.sample_rate as f32 / self.window_size as f32
    }
}

/// Noise rejection settings for the spectral estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Peaks weaker than this raw DFT magnitude are treated as noise.
    pub noise_threshold: f32,
    /// Bins below this frequency are zeroed to suppress mains hum.
    pub hum_cutoff_hz: f32,
    /// A window whose samples all stay within this amplitude is silent.
    pub silence_floor: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            noise_threshold: 11.0,
            hum_cutoff_hz: 62.0,
            silence_floor: 0.0,
        }
    }
}

/// What the policy sends when the pitch is outside both acceptable bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRangeAction {
    /// Send `Stop` and wait for the string to be brought into range by hand.
    #[default]
    Hold,
    /// Tighten when below the lower band, loosen otherwise.
    Directional,
    /// Always send a tighten step, whatever the direction.
    Nudge,
}

/// How an audible but untuned pitch picks between tightening and loosening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionRule {
    /// Tighten when more than `adjust_margin_hz` below either target,
    /// loosen otherwise. A reading in the fundamental band is always below
    /// the octave target, so it is always tightened.
    #[default]
    AnyTarget,
    /// Compare only against the target of the band the pitch fell in.
    MatchedBand,
}

/// An inclusive frequency band in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub low: f32,
    pub high: f32,
}

impl Band {
    pub const fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, freq: f32) -> bool {
        self.low <= freq && freq <= self.high
    }
}

/// Targets for a single string: its fundamental, the octave above, and the
/// coarse acceptable band around each of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringTarget {
    pub name: String,
    pub target_low_hz: f32,
    pub target_high_hz: f32,
    pub acceptable_low: Band,
    pub acceptable_high: Band,
}

impl StringTarget {
    pub fn new(name: &str, targets: (f32, f32), low: (f32, f32), high: (f32, f32)) -> Self {
        Self {
            name: name.to_string(),
            target_low_hz: targets.0,
            target_high_hz: targets.1,
            acceptable_low: Band::new(low.0, low.1),
            acceptable_high: Band::new(high.0, high.1),
        }
    }
}

/// Standard guitar tuning, each string paired with its octave.
pub fn standard_tuning() -> Vec<StringTarget> {
    vec![
        StringTarget::new("E2/E3", (82.0, 165.0), (75.0, 90.0), (150.0, 180.0)),
        StringTarget::new("A2/A3", (110.0, 220.0), (100.0, 120.0), (200.0, 240.0)),
        StringTarget::new("D3/D4", (147.0, 294.0), (140.0, 155.0), (280.0, 310.0)),
        StringTarget::new("G3/G4", (196.0, 392.0), (180.0, 210.0), (370.0, 410.0)),
        StringTarget::new("B3/B4", (247.0, 494.0), (230.0, 260.0), (460.0, 520.0)),
        StringTarget::new("e4/e5", (330.0, 659.0), (310.0, 350.0), (620.0, 700.0)),
    ]
}

/// Tuning policy parameters and the ordered string table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// Reference pitch of A4 in Hz.
    pub concert_pitch: f32,
    /// Half-width of the in-tune window around each target, in Hz.
    pub in_tune_tolerance_hz: f32,
    /// Distance below a target, in Hz, beyond which `any_target` tightens.
    pub adjust_margin_hz: f32,
    pub direction: DirectionRule,
    pub out_of_range: OutOfRangeAction,
    pub strings: Vec<StringTarget>,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            concert_pitch: 440.0,
            in_tune_tolerance_hz: 2.0,
            adjust_margin_hz: 1.0,
            direction: DirectionRule::default(),
            out_of_range: OutOfRangeAction::default(),
            strings: standard_tuning(),
        }
    }
}

/// Serial link to the tensioning device and the tokens it understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    pub port: String,
    pub baud_rate: u32,
    pub tighten_token: String,
    pub loosen_token: String,
    pub stop_token: String,
    /// Commands that may wait for the serial worker before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            tighten_token: "0".to_string(),
            loosen_token: "1".to_string(),
            stop_token: "STOP\n".to_string(),
            queue_capacity: 16,
        }
    }
}

/// External commands used to announce tuning progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub enabled: bool,
    /// Speech synthesizer; the phrase is written to its stdin.
    pub speech_command: Vec<String>,
    pub tuned_phrase: String,
    pub all_tuned_phrase: String,
    /// Optional sound player run on each tuned string, e.g. `["aplay", "tuned.wav"]`.
    pub sound_command: Vec<String>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            speech_command: vec!["festival".to_string(), "--tts".to_string()],
            tuned_phrase: "Tuned".to_string(),
            all_tuned_phrase: "All strings are tuned".to_string(),
            sound_command: Vec::new(),
        }
    }
}

impl TunerConfig {
    /// Loads a configuration from a JSON file and validates it.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|source| TunerError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        let config: TunerConfig = serde_json::from_str(&data)?;
        config.validate()?;
        log::info!("[CONFIG] Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::info!("[CONFIG] {} not found, using built-in defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| TunerError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("[CONFIG] Configuration saved to {}", path.display());
        Ok(())
    }

    /// Rejects configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: String) -> Result<()> {
            Err(TunerError::InvalidConfig(msg))
        }

        if self.audio.sample_rate == 0 {
            return invalid("sample_rate must be positive".into());
        }
        if self.audio.window_size < 2 {
            return invalid(format!("window_size {} is too small", self.audio.window_size));
        }
        if self.audio.window_step == 0 {
            return invalid("window_step must be positive".into());
        }
        if !(self.tuning.concert_pitch > 0.0) {
            return invalid(format!("concert_pitch {} must be positive", self.tuning.concert_pitch));
        }
        if self.tuning.in_tune_tolerance_hz < 0.0 || self.tuning.adjust_margin_hz < 0.0 {
            return invalid("tuning tolerances must not be negative".into());
        }
        if self.detection.noise_threshold < 0.0 || self.detection.hum_cutoff_hz < 0.0 {
            return invalid("detection thresholds must not be negative".into());
        }
        if self.tuning.strings.is_empty() {
            return invalid("at least one string target is required".into());
        }
        for string in &self.tuning.strings {
            for band in [string.acceptable_low, string.acceptable_high] {
                if band.low > band.high {
                    return invalid(format!(
                        "string {} has an inverted band {}-{}",
                        string.name, band.low, band.high
                    ));
                }
            }
        }
        Ok(())
    }
}
