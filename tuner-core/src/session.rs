//! # Session Module
//!
//! Glue between the audio callback and the rest of the system. A
//! `TuningSession` is moved into the capture callback; for every block it runs
//! the controller, hands the resulting effects to the worker threads and
//! publishes a display snapshot. It never blocks and never lets a panic escape
//! into the audio thread.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::actuator::ActuatorDispatcher;
use crate::controller::{BlockProcessor, CycleReport, Effect, TuningController};
use crate::notify::NotifyDispatcher;
use crate::DisplaySnapshot;

/// Receiving ends handed to the application.
pub struct SessionChannels {
    /// Display snapshots, one per decided cycle.
    pub snapshots: Receiver<DisplaySnapshot>,
    /// Fires once when the last string is tuned.
    pub finished: Receiver<()>,
}

pub struct TuningSession<P = TuningController> {
    controller: P,
    actuator: Arc<ActuatorDispatcher>,
    notifier: Arc<NotifyDispatcher>,
    snapshot_tx: Sender<DisplaySnapshot>,
    finished_tx: Option<Sender<()>>,
}

impl<P: BlockProcessor> TuningSession<P> {
    /// Creates a session and the channels the application listens on.
    ///
    /// At most `snapshot_capacity` snapshots wait for the display; newer ones
    /// are dropped while it lags.
    pub fn new(
        controller: P,
        actuator: Arc<ActuatorDispatcher>,
        notifier: Arc<NotifyDispatcher>,
        snapshot_capacity: usize,
    ) -> (Self, SessionChannels) {
        let (snapshot_tx, snapshots) = crossbeam_channel::bounded(snapshot_capacity.max(1));
        let (finished_tx, finished) = crossbeam_channel::bounded(1);
        let session = Self {
            controller,
            actuator,
            notifier,
            snapshot_tx,
            finished_tx: Some(finished_tx),
        };
        (session, SessionChannels { snapshots, finished })
    }

    pub fn controller(&self) -> &P {
        &self.controller
    }

    /// Handles one block from the audio callback.
    ///
    /// Returns `None` when the cycle panicked and was skipped.
    pub fn on_block(&mut self, block: &[f32]) -> Option<CycleReport> {
        let controller = &mut self.controller;
        let report = match panic::catch_unwind(AssertUnwindSafe(|| controller.process_block(block))) {
            Ok(report) => report,
            Err(_) => {
                log::error!("[SESSION] Cycle panicked, skipping block");
                return None;
            }
        };

        for effect in &report.effects {
            match effect {
                Effect::Actuate(command) => {
                    self.actuator.dispatch(*command);
                }
                Effect::Notify(event) => self.notifier.dispatch(event.clone()),
            }
        }

        if let Some(snapshot) = &report.snapshot {
            match self.snapshot_tx.try_send(snapshot.clone()) {
                Ok(()) | Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Disconnected(_)) => {
                    log::trace!("[SESSION] No display attached");
                }
            }
        }

        if self.controller.is_done() {
            if let Some(tx) = self.finished_tx.take() {
                let _ = tx.send(());
            }
        }

        Some(report)
    }
}
