//! # Controller Module
//!
//! One audio block in, one `CycleReport` out. The controller owns the
//! analysis window and the sequencer and performs no I/O: the effects it
//! wants carried out (actuator commands, notifications) are returned to the
//! caller, which dispatches them.

use crate::audio::AudioWindow;
use crate::config::TunerConfig;
use crate::notify::NotifyEvent;
use crate::pitch::{self, Detection, PitchDetector};
use crate::policy::{ActuatorCommand, Decision, TuningPolicy};
use crate::sequencer::{Transition, TuningSequencer, TuningState};
use crate::tuning;
use crate::DisplaySnapshot;

/// A side effect requested by a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Actuate(ActuatorCommand),
    Notify(NotifyEvent),
}

/// Everything one cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub detection: Detection,
    pub decision: Option<Decision>,
    pub transition: Transition,
    pub snapshot: Option<DisplaySnapshot>,
    pub effects: Vec<Effect>,
}

impl CycleReport {
    fn idle(detection: Detection, transition: Transition) -> Self {
        Self {
            detection,
            decision: None,
            transition,
            snapshot: None,
            effects: Vec::new(),
        }
    }

    /// Actuator commands in the order they must be sent.
    pub fn commands(&self) -> impl Iterator<Item = ActuatorCommand> + '_ {
        self.effects.iter().filter_map(|effect| match effect {
            Effect::Actuate(command) => Some(*command),
            Effect::Notify(_) => None,
        })
    }
}

/// A per-block processing stage driven by the audio callback.
pub trait BlockProcessor {
    fn process_block(&mut self, block: &[f32]) -> CycleReport;

    /// True once no further block can change anything.
    fn is_done(&self) -> bool;
}

/// The per-callback tuning pipeline.
#[derive(Debug)]
pub struct TuningController {
    window: AudioWindow,
    detector: PitchDetector,
    policy: TuningPolicy,
    sequencer: TuningSequencer,
    concert_pitch: f32,
    silence_floor: f32,
}

impl TuningController {
    pub fn new(config: &TunerConfig) -> Self {
        Self {
            window: AudioWindow::new(config.audio.window_size),
            detector: PitchDetector::new(&config.audio, &config.detection),
            policy: TuningPolicy::from_config(&config.tuning),
            sequencer: TuningSequencer::new(config.tuning.strings.clone()),
            concert_pitch: config.tuning.concert_pitch,
            silence_floor: config.detection.silence_floor,
        }
    }

    pub fn state(&self) -> TuningState {
        self.sequencer.state()
    }

    pub fn is_done(&self) -> bool {
        self.sequencer.is_done()
    }

    /// Slides `block` into the window and runs one decision cycle.
    ///
    /// A silent block is not added to the window and skips the cycle, as do
    /// sub-threshold windows. Once every string is tuned all further blocks
    /// are ignored.
    pub fn process_block(&mut self, block: &[f32]) -> CycleReport {
        if self.sequencer.is_done() {
            return CycleReport::idle(Detection::NoInput, Transition::Finished);
        }
        if pitch::is_silent(block, self.silence_floor) {
            log::debug!("[CONTROL] no input");
            return CycleReport::idle(Detection::NoInput, Transition::Held);
        }

        self.window.push(block);
        let detection = self.detector.detect(self.window.samples());
        let Some(estimate) = detection.estimate() else {
            log::trace!("[CONTROL] skipped cycle: {:?}", detection);
            return CycleReport::idle(detection, Transition::Held);
        };

        // The sequencer is not done, so there is an active string.
        let Some(string) = self.sequencer.active().cloned() else {
            return CycleReport::idle(detection, Transition::Finished);
        };

        let frequency = estimate.frequency_hz as f32;
        let decision = self.policy.decide(frequency, &string);
        let note = tuning::find_nearest_note(frequency, self.concert_pitch);
        let state = self.sequencer.state();

        log::debug!(
            "[CONTROL] {} string: {} Hz -> {}",
            string.name,
            estimate.frequency_hz,
            decision.status()
        );

        let mut snapshot = DisplaySnapshot {
            string_name: string.name.clone(),
            string_index: state.active_string_index,
            string_count: self.sequencer.strings().len(),
            detected_hz: estimate.frequency_hz,
            cents_deviation: note
                .as_ref()
                .map(|n| tuning::calculate_cents_deviation(frequency, n.frequency)),
            note_frequency_hz: note.as_ref().map(|n| n.frequency),
            note_name: note.map(|n| n.name),
            target_low_hz: string.target_low_hz,
            target_high_hz: string.target_high_hz,
            status: decision.status().to_string(),
            done: false,
        };

        let mut effects = vec![Effect::Actuate(decision.command)];
        if decision.is_in_tune() {
            effects.push(Effect::Notify(NotifyEvent::StringTuned {
                name: string.name.clone(),
            }));
        }

        let transition = self.sequencer.apply(&decision);
        match transition {
            Transition::Advanced { to, .. } => {
                log::info!(
                    "[CONTROL] {} string is in tune, moving to string {}",
                    string.name,
                    to + 1
                );
            }
            Transition::Completed { final_command } => {
                log::info!("[CONTROL] All strings are tuned.");
                effects.push(Effect::Actuate(final_command));
                effects.push(Effect::Notify(NotifyEvent::AllTuned));
                snapshot.status = "All strings are tuned".to_string();
                snapshot.done = true;
            }
            Transition::Held | Transition::Finished => {}
        }

        CycleReport {
            detection,
            decision: Some(decision),
            transition,
            snapshot: Some(snapshot),
            effects,
        }
    }
}

impl BlockProcessor for TuningController {
    fn process_block(&mut self, block: &[f32]) -> CycleReport {
        TuningController::process_block(self, block)
    }

    fn is_done(&self) -> bool {
        TuningController::is_done(self)
    }
}
