//! # Tuning Policy Module
//!
//! Decides, for a single pitch estimate and the string being tuned, which
//! command the actuator receives. Two nested windows drive the decision:
//!
//! - the acceptable bands are a coarse gate that keeps neighbouring strings
//!   and stray peaks from moving the actuator;
//! - the in-tune tolerance is the fine window around each target.
//!
//! Every cycle is judged on its own; the policy keeps no history.

use crate::config::{DirectionRule, OutOfRangeAction, StringTarget, TuningConfig};

/// Discrete commands understood by the tensioning device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActuatorCommand {
    TightenStep,
    LoosenStep,
    Stop,
}

/// Classification of one cycle for the active string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    InTune,
    IncreaseTension,
    DecreaseTension,
    OutOfRange,
}

impl Verdict {
    /// Human-readable status line.
    pub fn status(&self) -> &'static str {
        match self {
            Verdict::InTune => "Tuned",
            Verdict::IncreaseTension => "Increase tension",
            Verdict::DecreaseTension => "Decrease tension",
            Verdict::OutOfRange => "Out of range, adjust manually",
        }
    }
}

/// A verdict together with the command it sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub verdict: Verdict,
    pub command: ActuatorCommand,
}

impl Decision {
    fn new(verdict: Verdict, command: ActuatorCommand) -> Self {
        Self { verdict, command }
    }

    pub fn is_in_tune(&self) -> bool {
        self.verdict == Verdict::InTune
    }

    pub fn status(&self) -> &'static str {
        self.verdict.status()
    }
}

/// Stateless decision rules for one string at a time.
#[derive(Debug, Clone)]
pub struct TuningPolicy {
    in_tune_tolerance_hz: f32,
    adjust_margin_hz: f32,
    direction: DirectionRule,
    out_of_range: OutOfRangeAction,
}

impl TuningPolicy {
    /// Policy with the default direction rule and a 1 Hz adjust margin.
    pub fn new(in_tune_tolerance_hz: f32, out_of_range: OutOfRangeAction) -> Self {
        Self {
            in_tune_tolerance_hz,
            adjust_margin_hz: 1.0,
            direction: DirectionRule::default(),
            out_of_range,
        }
    }

    pub fn with_direction(mut self, direction: DirectionRule, adjust_margin_hz: f32) -> Self {
        self.direction = direction;
        self.adjust_margin_hz = adjust_margin_hz;
        self
    }

    pub fn from_config(config: &TuningConfig) -> Self {
        Self::new(config.in_tune_tolerance_hz, config.out_of_range)
            .with_direction(config.direction, config.adjust_margin_hz)
    }

    /// Decides the command for `frequency_hz` on `string`.
    ///
    /// Rules, first match wins:
    /// 1. outside both acceptable bands: out of range
    /// 2. strictly within tolerance of either target: in tune, `Stop`
    /// 3. below a target, as the direction rule reads it: `TightenStep`
    /// 4. otherwise: `LoosenStep`
    pub fn decide(&self, frequency_hz: f32, string: &StringTarget) -> Decision {
        let target = if string.acceptable_low.contains(frequency_hz) {
            string.target_low_hz
        } else if string.acceptable_high.contains(frequency_hz) {
            string.target_high_hz
        } else {
            return Decision::new(Verdict::OutOfRange, self.out_of_range_command(frequency_hz, string));
        };

        let tol = self.in_tune_tolerance_hz;
        let near = |t: f32| (frequency_hz - t).abs() < tol;
        if near(string.target_low_hz) || near(string.target_high_hz) {
            return Decision::new(Verdict::InTune, ActuatorCommand::Stop);
        }

        let tighten = match self.direction {
            DirectionRule::AnyTarget => {
                let margin = self.adjust_margin_hz;
                frequency_hz < string.target_low_hz - margin
                    || frequency_hz < string.target_high_hz - margin
            }
            DirectionRule::MatchedBand => frequency_hz < target,
        };

        if tighten {
            Decision::new(Verdict::IncreaseTension, ActuatorCommand::TightenStep)
        } else {
            Decision::new(Verdict::DecreaseTension, ActuatorCommand::LoosenStep)
        }
    }

    fn out_of_range_command(&self, frequency_hz: f32, string: &StringTarget) -> ActuatorCommand {
        match self.out_of_range {
            OutOfRangeAction::Hold => ActuatorCommand::Stop,
            OutOfRangeAction::Nudge => ActuatorCommand::TightenStep,
            OutOfRangeAction::Directional => {
                if frequency_hz < string.acceptable_low.low {
                    ActuatorCommand::TightenStep
                } else if frequency_hz > string.acceptable_high.high {
                    ActuatorCommand::LoosenStep
                } else if frequency_hz < string.acceptable_high.low {
                    // Between the bands: head for the nearer one.
                    let to_low = frequency_hz - string.acceptable_low.high;
                    let to_high = string.acceptable_high.low - frequency_hz;
                    if to_high < to_low {
                        ActuatorCommand::TightenStep
                    } else {
                        ActuatorCommand::LoosenStep
                    }
                } else {
                    ActuatorCommand::Stop
                }
            }
        }
    }
}
