use std::sync::{Arc, Mutex};
use std::time::Duration;

use tuner_core::actuator::{ActuatorDispatcher, RecordingActuator};
use tuner_core::config::{DirectionRule, StringTarget};
use tuner_core::controller::{BlockProcessor, CycleReport, TuningController};
use tuner_core::sequencer::Transition;
use tuner_core::notify::{Notifier, NotifyDispatcher, NotifyEvent};
use tuner_core::session::TuningSession;
use tuner_core::{ActuatorCommand, TunerConfig};

#[derive(Clone, Default)]
struct Collect(Arc<Mutex<Vec<NotifyEvent>>>);

impl Notifier for Collect {
    fn notify(&mut self, event: &NotifyEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

/// A small window keeps these tests quick: 4410 samples at 44.1 kHz gives
/// 10 Hz bins. Directions are judged against the matched band so a sharp
/// fundamental is loosened.
fn small_config() -> TunerConfig {
    let mut config = TunerConfig::default();
    config.tuning.direction = DirectionRule::MatchedBand;
    config.audio.window_size = 4_410;
    config.audio.window_step = 4_410;
    config.tuning.strings = vec![
        StringTarget::new("A2/A3", (110.0, 220.0), (100.0, 120.0), (200.0, 240.0)),
        StringTarget::new("E4/E5", (330.0, 660.0), (310.0, 350.0), (620.0, 700.0)),
    ];
    config
}

/// Delegates to a real controller but panics on an empty block.
struct PanicsOnEmpty(TuningController);

impl BlockProcessor for PanicsOnEmpty {
    fn process_block(&mut self, block: &[f32]) -> CycleReport {
        assert!(!block.is_empty(), "empty block");
        self.0.process_block(block)
    }

    fn is_done(&self) -> bool {
        self.0.is_done()
    }
}

fn sine(freq: f64, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (0.5 * (2.0 * std::f64::consts::PI * freq * i as f64 / 44_100.0).sin()) as f32)
        .collect()
}

#[test]
fn test_session_dispatches_effects_and_signals_completion() {
    let config = small_config();
    let recorder = RecordingActuator::new();
    let collect = Collect::default();
    let actuator = Arc::new(ActuatorDispatcher::spawn(Box::new(recorder.clone()), 16));
    let notifier = Arc::new(NotifyDispatcher::spawn(Box::new(collect.clone())));

    let (mut session, channels) = TuningSession::new(
        TuningController::new(&config),
        Arc::clone(&actuator),
        Arc::clone(&notifier),
        8,
    );

    // 350 Hz is in the E4 band, but the A string is active: out of range.
    session.on_block(&sine(350.0, 4_410));
    // Flat A, then in tune.
    session.on_block(&sine(100.0, 4_410));
    session.on_block(&sine(110.0, 4_410));
    assert!(channels.finished.try_recv().is_err());
    // Sharp E, then in tune.
    session.on_block(&sine(340.0, 4_410));
    session.on_block(&sine(330.0, 4_410));

    channels
        .finished
        .recv_timeout(Duration::from_secs(1))
        .expect("completion signal");
    assert!(session.controller().is_done());

    let snapshots: Vec<_> = channels.snapshots.try_iter().collect();
    assert_eq!(snapshots.len(), 5);
    assert_eq!(snapshots[0].status, "Out of range, adjust manually");
    assert_eq!(snapshots[1].status, "Increase tension");
    assert_eq!(snapshots[3].string_name, "E4/E5");
    assert_eq!(snapshots[3].status, "Decrease tension");
    assert!(snapshots[4].done);

    drop(session);
    Arc::try_unwrap(actuator).ok().expect("sole owner").shutdown();
    Arc::try_unwrap(notifier).ok().expect("sole owner").shutdown();

    assert_eq!(
        recorder.sent(),
        vec![
            ActuatorCommand::Stop, // out of range: hold
            ActuatorCommand::TightenStep,
            ActuatorCommand::Stop,
            ActuatorCommand::LoosenStep,
            ActuatorCommand::Stop,
            ActuatorCommand::Stop, // closing stop
        ]
    );
    assert_eq!(
        *collect.0.lock().unwrap(),
        vec![
            NotifyEvent::StringTuned { name: "A2/A3".into() },
            NotifyEvent::StringTuned { name: "E4/E5".into() },
            NotifyEvent::AllTuned,
        ]
    );
}

#[test]
fn test_panicking_cycle_is_skipped_and_session_continues() {
    let config = small_config();
    let recorder = RecordingActuator::new();
    let actuator = Arc::new(ActuatorDispatcher::spawn(Box::new(recorder.clone()), 16));
    let notifier = Arc::new(NotifyDispatcher::spawn(Box::new(Collect::default())));

    let (mut session, channels) = TuningSession::new(
        PanicsOnEmpty(TuningController::new(&config)),
        Arc::clone(&actuator),
        Arc::clone(&notifier),
        8,
    );

    assert!(session.on_block(&[]).is_none());
    assert!(channels.snapshots.try_recv().is_err());

    let report = session.on_block(&sine(110.0, 4_410)).expect("cycle after panic");
    assert_eq!(report.transition, Transition::Advanced { from: 0, to: 1 });
    assert_eq!(session.controller().0.state().active_string_index, 1);
    assert_eq!(channels.snapshots.try_recv().unwrap().status, "Tuned");

    drop(session);
    Arc::try_unwrap(actuator).ok().expect("sole owner").shutdown();
    Arc::try_unwrap(notifier).ok().expect("sole owner").shutdown();
    assert_eq!(recorder.sent(), vec![ActuatorCommand::Stop]);
}

#[test]
fn test_config_round_trips_through_file() {
    let path = std::env::temp_dir().join(format!("tuner-config-{}.json", std::process::id()));
    let mut config = TunerConfig::default();
    config.actuator.port = "/dev/ttyACM0".into();
    config.tuning.concert_pitch = 442.0;

    config.save(&path).unwrap();
    let loaded = TunerConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded, config);
}

#[test]
fn test_missing_config_uses_defaults() {
    let path = std::env::temp_dir().join("tuner-config-that-does-not-exist.json");
    let loaded = TunerConfig::load_or_default(&path).unwrap();
    assert_eq!(loaded, TunerConfig::default());
}
