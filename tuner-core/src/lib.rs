// tuner-core/src/lib.rs

//! The core logic for the automated string tuner.
//! This crate is responsible for audio processing, pitch detection,
//! the tuning decisions and the actuator protocol. It is completely
//! headless and contains no UI code.

pub mod actuator;
pub mod audio;
pub mod config;
pub mod controller;
pub mod error;
pub mod fft;
pub mod notify;
pub mod pitch;
pub mod policy;
pub mod sequencer;
pub mod session;
pub mod tuning;

pub use config::TunerConfig;
pub use error::TunerError;
pub use policy::ActuatorCommand;

/// What a display shows after a processed audio cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySnapshot {
    /// Name of the string the cycle was judged against.
    pub string_name: String,
    /// Zero-based position of that string in the table.
    pub string_index: usize,
    pub string_count: usize,
    /// The detected frequency in whole Hz.
    pub detected_hz: u32,
    /// Nearest note to the detected frequency.
    pub note_name: Option<String>,
    /// Equal-tempered frequency of `note_name`.
    pub note_frequency_hz: Option<f32>,
    /// Deviation of the detected frequency from `note_frequency_hz`.
    pub cents_deviation: Option<f32>,
    pub target_low_hz: f32,
    pub target_high_hz: f32,
    pub status: String,
    /// Set once every string is tuned.
    pub done: bool,
}
