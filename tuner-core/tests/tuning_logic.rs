use tuner_core::controller::{Effect, TuningController};
use tuner_core::notify::NotifyEvent;
use tuner_core::pitch::Detection;
use tuner_core::policy::Verdict;
use tuner_core::sequencer::Transition;
use tuner_core::config::DirectionRule;
use tuner_core::{ActuatorCommand, TunerConfig};

const SAMPLE_RATE: f64 = 44_100.0;

/// One full default window of a sine at `freq` Hz.
fn sine(freq: f64, amplitude: f64) -> Vec<f32> {
    (0..44_100)
        .map(|i| (amplitude * (2.0 * std::f64::consts::PI * freq * i as f64 / SAMPLE_RATE).sin()) as f32)
        .collect()
}

fn mix(a: &[f32], b: &[f32]) -> Vec<f32> {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

fn controller() -> TuningController {
    TuningController::new(&TunerConfig::default())
}

#[test]
fn test_flat_low_e_is_tightened() {
    let mut ctl = controller();
    let report = ctl.process_block(&sine(80.0, 0.5));

    assert_eq!(report.detection.estimate().map(|e| e.frequency_hz), Some(80));
    let decision = report.decision.expect("decision");
    assert_eq!(decision.command, ActuatorCommand::TightenStep);
    assert_eq!(decision.status(), "Increase tension");
    assert_eq!(report.transition, Transition::Held);
    assert_eq!(ctl.state().active_string_index, 0);

    let snapshot = report.snapshot.expect("snapshot");
    assert_eq!(snapshot.string_name, "E2/E3");
    assert_eq!(snapshot.detected_hz, 80);
    assert_eq!(snapshot.target_low_hz, 82.0);
    assert_eq!(snapshot.target_high_hz, 165.0);
}

#[test]
fn test_in_tune_low_e_advances() {
    let mut ctl = controller();
    let report = ctl.process_block(&sine(82.0, 0.5));

    assert_eq!(report.commands().collect::<Vec<_>>(), vec![ActuatorCommand::Stop]);
    assert!(report.effects.contains(&Effect::Notify(NotifyEvent::StringTuned {
        name: "E2/E3".into()
    })));
    assert_eq!(report.transition, Transition::Advanced { from: 0, to: 1 });
    assert_eq!(ctl.state().active_string_index, 1);
    assert_eq!(report.snapshot.unwrap().note_name.as_deref(), Some("E2"));
}

#[test]
fn test_out_of_range_holds() {
    let mut ctl = controller();
    let report = ctl.process_block(&sine(120.0, 0.5));

    let decision = report.decision.expect("decision");
    assert_eq!(decision.verdict, Verdict::OutOfRange);
    assert_eq!(decision.status(), "Out of range, adjust manually");
    assert_eq!(ctl.state().active_string_index, 0);
}

#[test]
fn test_octave_counts_as_in_tune() {
    let mut ctl = controller();
    ctl.process_block(&sine(165.0, 0.5));
    assert_eq!(ctl.state().active_string_index, 1);
}

#[test]
fn test_noise_below_threshold_is_ignored() {
    let mut ctl = controller();
    // Peak magnitude is about 1e-4 * 44100 / 2, far below 11.
    let report = ctl.process_block(&sine(82.0, 1e-4));

    assert!(matches!(report.detection, Detection::BelowNoise { .. }));
    assert!(report.decision.is_none());
    assert!(report.effects.is_empty());
    assert!(report.snapshot.is_none());
    assert_eq!(ctl.state().active_string_index, 0);
}

#[test]
fn test_silence_is_no_input() {
    let mut ctl = controller();
    let report = ctl.process_block(&vec![0.0; 21_050]);

    assert_eq!(report.detection, Detection::NoInput);
    assert!(report.effects.is_empty());
    assert_eq!(ctl.state().active_string_index, 0);
}

#[test]
fn test_mains_hum_is_suppressed() {
    let mut ctl = controller();

    let hum_only = ctl.process_block(&sine(50.0, 1.0));
    assert!(hum_only.decision.is_none(), "hum alone must not drive the actuator");

    let with_string = mix(&sine(50.0, 1.0), &sine(86.0, 0.2));
    let report = ctl.process_block(&with_string);
    assert_eq!(report.detection.estimate().map(|e| e.frequency_hz), Some(86));
    // Still more than 1 Hz below the 165 Hz octave target.
    assert_eq!(report.decision.unwrap().command, ActuatorCommand::TightenStep);
}

#[test]
fn test_direction_rule_decides_sharp_fundamental() {
    let mut ctl = controller();
    let report = ctl.process_block(&sine(88.0, 0.5));
    assert_eq!(report.decision.unwrap().command, ActuatorCommand::TightenStep);

    let mut config = TunerConfig::default();
    config.tuning.direction = DirectionRule::MatchedBand;
    let mut ctl = TuningController::new(&config);
    let report = ctl.process_block(&sine(88.0, 0.5));
    let decision = report.decision.unwrap();
    assert_eq!(decision.command, ActuatorCommand::LoosenStep);
    assert_eq!(decision.status(), "Decrease tension");
}

#[test]
fn test_identical_windows_give_identical_commands() {
    let mut ctl = controller();
    let window = sine(87.0, 0.5);
    let first = ctl.process_block(&window);
    let second = ctl.process_block(&window);

    assert_eq!(first.decision, second.decision);
    assert_eq!(first.commands().collect::<Vec<_>>(), second.commands().collect::<Vec<_>>());
    assert_eq!(ctl.state().active_string_index, 0);
}

#[test]
fn test_full_run_terminates_with_one_final_stop() {
    let mut ctl = controller();
    let targets = [82.0, 110.0, 147.0, 196.0, 247.0, 330.0];
    let mut last_index = 0;
    let mut completions = 0;
    let mut commands = Vec::new();

    for (i, &freq) in targets.iter().enumerate() {
        // A flat reading first: nothing may advance.
        let flat = ctl.process_block(&sine(freq - 5.0, 0.5));
        assert_eq!(flat.transition, Transition::Held);
        assert_eq!(ctl.state().active_string_index, i);
        commands.extend(flat.commands());

        let tuned = ctl.process_block(&sine(freq, 0.5));
        let index = ctl.state().active_string_index;
        assert!(index >= last_index);
        assert_eq!(index, i + 1);
        last_index = index;
        if let Transition::Completed { .. } = tuned.transition {
            completions += 1;
            assert!(tuned.effects.contains(&Effect::Notify(NotifyEvent::AllTuned)));
            assert!(tuned.snapshot.as_ref().unwrap().done);
        }
        commands.extend(tuned.commands());
    }

    assert_eq!(completions, 1);
    assert!(ctl.is_done());
    // One stop per tuned string plus the closing one, which comes last.
    assert_eq!(commands.iter().filter(|c| **c == ActuatorCommand::Stop).count(), 7);
    assert_eq!(commands.last(), Some(&ActuatorCommand::Stop));
    assert_eq!(
        commands.iter().filter(|c| **c == ActuatorCommand::TightenStep).count(),
        6
    );

    // Nothing is processed after completion.
    let after = ctl.process_block(&sine(82.0, 0.5));
    assert_eq!(after.transition, Transition::Finished);
    assert!(after.effects.is_empty());
    assert_eq!(ctl.state().active_string_index, 6);
}

#[test]
fn test_wrong_string_does_not_advance() {
    let mut ctl = controller();
    // The A string's fundamental while the low E is active.
    ctl.process_block(&sine(110.0, 0.5));
    assert_eq!(ctl.state().active_string_index, 0);
}
