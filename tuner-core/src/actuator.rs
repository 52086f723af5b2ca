//! # Actuator Channel Module
//!
//! One-way link to the external tensioning device. Each `ActuatorCommand` is
//! encoded as a configured token and written to the link; the device never
//! answers, so the only feedback is the next pitch measurement.
//!
//! Writes happen on a dedicated worker thread. The audio callback hands
//! commands over with a non-blocking `try_send`, and a slow or failing serial
//! port costs at most a dropped command.

use crossbeam_channel::{Sender, TrySendError};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::ActuatorConfig;
use crate::error::{Result, TunerError};
use crate::policy::ActuatorCommand;

/// Byte tokens for each command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTokens {
    pub tighten: Vec<u8>,
    pub loosen: Vec<u8>,
    pub stop: Vec<u8>,
}

impl CommandTokens {
    pub fn from_config(config: &ActuatorConfig) -> Self {
        Self {
            tighten: config.tighten_token.as_bytes().to_vec(),
            loosen: config.loosen_token.as_bytes().to_vec(),
            stop: config.stop_token.as_bytes().to_vec(),
        }
    }

    pub fn encode(&self, command: ActuatorCommand) -> &[u8] {
        match command {
            ActuatorCommand::TightenStep => &self.tighten,
            ActuatorCommand::LoosenStep => &self.loosen,
            ActuatorCommand::Stop => &self.stop,
        }
    }
}

impl Default for CommandTokens {
    fn default() -> Self {
        Self::from_config(&ActuatorConfig::default())
    }
}

/// A sink for encoded actuator commands.
pub trait ActuatorLink: Send {
    fn send(&mut self, command: ActuatorCommand) -> Result<()>;
}

/// Serial port link to the tensioning device.
pub struct SerialActuator {
    port: Box<dyn serialport::SerialPort>,
    tokens: CommandTokens,
}

impl SerialActuator {
    /// Opens the configured port. Failure here is fatal for the tuner.
    pub fn open(config: &ActuatorConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(Duration::from_millis(200))
            .open()
            .map_err(|e| TunerError::ActuatorOpen {
                port: config.port.clone(),
                reason: e.to_string(),
            })?;
        log::info!("[ACTUATOR] Opened {} at {} baud", config.port, config.baud_rate);
        Ok(Self {
            port,
            tokens: CommandTokens::from_config(config),
        })
    }
}

impl ActuatorLink for SerialActuator {
    fn send(&mut self, command: ActuatorCommand) -> Result<()> {
        let bytes = self.tokens.encode(command);
        self.port
            .write_all(bytes)
            .and_then(|_| self.port.flush())
            .map_err(|e| TunerError::ActuatorWrite(e.to_string()))
    }
}

/// In-memory link that records every command, used by `--dry-run` and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    sent: Arc<Mutex<Vec<ActuatorCommand>>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands received so far, oldest first.
    pub fn sent(&self) -> Vec<ActuatorCommand> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl ActuatorLink for RecordingActuator {
    fn send(&mut self, command: ActuatorCommand) -> Result<()> {
        log::debug!("[ACTUATOR] (dry run) {:?}", command);
        self.sent
            .lock()
            .map_err(|_| TunerError::ActuatorWrite("recording lock poisoned".into()))?
            .push(command);
        Ok(())
    }
}

enum ActuatorMessage {
    Command(ActuatorCommand),
    Shutdown,
}

/// Owns an `ActuatorLink` on a worker thread and feeds it from a bounded queue.
pub struct ActuatorDispatcher {
    tx: Sender<ActuatorMessage>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ActuatorDispatcher {
    /// Moves `link` onto a new worker thread.
    pub fn spawn(mut link: Box<dyn ActuatorLink>, queue_capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded::<ActuatorMessage>(queue_capacity.max(1));
        let thread_handle = thread::spawn(move || {
            log::debug!("[ACTUATOR] Worker started");
            for message in rx.iter() {
                match message {
                    ActuatorMessage::Command(command) => {
                        if let Err(e) = link.send(command) {
                            log::warn!("[ACTUATOR] {:?} not delivered: {}", command, e);
                        }
                    }
                    ActuatorMessage::Shutdown => break,
                }
            }
            // Dropping the link closes the port.
            drop(link);
            log::debug!("[ACTUATOR] Worker finished");
        });
        Self {
            tx,
            thread_handle: Some(thread_handle),
        }
    }

    /// Queues a command without blocking. Returns false if it was dropped.
    pub fn dispatch(&self, command: ActuatorCommand) -> bool {
        match self.tx.try_send(ActuatorMessage::Command(command)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("[ACTUATOR] Queue full, dropping {:?}", command);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("[ACTUATOR] Worker gone, dropping {:?}", command);
                false
            }
        }
    }

    /// Sends everything already queued, then closes the link.
    pub fn shutdown(mut self) {
        self.stop_worker();
    }

    fn stop_worker(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            let _ = self.tx.send(ActuatorMessage::Shutdown);
            if handle.join().is_err() {
                log::error!("[ACTUATOR] Worker panicked");
            }
        }
    }
}

impl Drop for ActuatorDispatcher {
    fn drop(&mut self) {
        self.stop_worker();
    }
}
