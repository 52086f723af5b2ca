//! Error types shared by the tuner core.

use thiserror::Error;

/// Errors raised while configuring or driving the tuner.
#[derive(Error, Debug)]
pub enum TunerError {
    /// Reading or writing the configuration file failed.
    #[error("Configuration I/O error on {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid JSON for `TunerConfig`.
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
    /// The configuration parsed but its values are unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// The actuator link could not be opened.
    #[error("Failed to open actuator on {port}: {reason}")]
    ActuatorOpen { port: String, reason: String },
    /// A command could not be written to the actuator.
    #[error("Actuator write failed: {0}")]
    ActuatorWrite(String),
}

pub type Result<T> = std::result::Result<T, TunerError>;
