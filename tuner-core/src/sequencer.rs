//! # Tuning Sequencer Module
//!
//! Walks the ordered string table one string at a time. A string is left as
//! soon as the policy reports it in tune and is never revisited, even if it
//! drifts afterwards.

use crate::config::StringTarget;
use crate::policy::{ActuatorCommand, Decision};

/// Position of the sequencer in the string table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuningState {
    pub active_string_index: usize,
    pub done: bool,
}

/// Outcome of feeding one decision to the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The active string is unchanged.
    Held,
    /// The string at `from` is tuned and `to` is now active.
    Advanced { from: usize, to: usize },
    /// The last string is tuned; `final_command` is the closing `Stop`.
    Completed { final_command: ActuatorCommand },
    /// The sequence had already finished; the decision was ignored.
    Finished,
}

/// Linear state machine over the string table.
#[derive(Debug, Clone)]
pub struct TuningSequencer {
    strings: Vec<StringTarget>,
    state: TuningState,
}

impl TuningSequencer {
    pub fn new(strings: Vec<StringTarget>) -> Self {
        let done = strings.is_empty();
        Self {
            strings,
            state: TuningState {
                active_string_index: 0,
                done,
            },
        }
    }

    pub fn state(&self) -> TuningState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state.done
    }

    pub fn strings(&self) -> &[StringTarget] {
        &self.strings
    }

    /// The string being tuned, or `None` once every string is done.
    pub fn active(&self) -> Option<&StringTarget> {
        if self.state.done {
            None
        } else {
            self.strings.get(self.state.active_string_index)
        }
    }

    /// Applies one policy decision for the active string.
    pub fn apply(&mut self, decision: &Decision) -> Transition {
        if self.state.done {
            return Transition::Finished;
        }
        if !decision.is_in_tune() {
            return Transition::Held;
        }

        let from = self.state.active_string_index;
        self.state.active_string_index += 1;
        if self.state.active_string_index >= self.strings.len() {
            self.state.done = true;
            Transition::Completed {
                final_command: ActuatorCommand::Stop,
            }
        } else {
            Transition::Advanced {
                from,
                to: self.state.active_string_index,
            }
        }
    }
}
