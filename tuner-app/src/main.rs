//! # String Tuner - Automated Tuning Front End
//!
//! Wires the tuner core to the real world: the default audio input, the
//! serial actuator, the speech/sound notifier and a console status display.
//!
//! ## Architecture
//! - **Audio Thread**: CPAL callback running the tuning session per block
//! - **Worker Threads**: actuator writes and notifications, fed by channels
//! - **Main Thread**: renders display snapshots and waits for completion or
//!   a user shutdown

mod display;

use anyhow::{Context, Result};
use clap::Parser;
use cpal::traits::StreamTrait;
use crossbeam_channel::Sender;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use tuner_core::actuator::{ActuatorDispatcher, ActuatorLink, RecordingActuator, SerialActuator};
use tuner_core::controller::TuningController;
use tuner_core::notify::{CommandNotifier, LogNotifier, Notifier, NotifyDispatcher};
use tuner_core::session::TuningSession;
use tuner_core::{ActuatorCommand, TunerConfig, audio};

// Snapshots buffered for the display before new ones are dropped
const SNAPSHOT_CAPACITY: usize = 8;

/// Automatically tunes each string in turn by driving a tensioning actuator.
#[derive(Parser, Debug)]
#[command(name = "string-tuner", version, about)]
struct Cli {
    /// Configuration file (JSON). Built-in defaults are used if it is absent.
    #[arg(short, long, default_value = "tuner.json")]
    config: PathBuf,

    /// Serial port of the actuator, overriding the configuration.
    #[arg(short, long)]
    port: Option<String>,

    /// Log actuator commands instead of writing them to the serial port.
    #[arg(long)]
    dry_run: bool,

    /// Log notifications instead of running the speech and sound commands.
    #[arg(long)]
    quiet: bool,

    /// Write the built-in configuration to `--config` and exit.
    #[arg(long)]
    write_default_config: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    if cli.write_default_config {
        TunerConfig::default()
            .save(&cli.config)
            .with_context(|| format!("writing {}", cli.config.display()))?;
        return Ok(());
    }

    let mut config = TunerConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(port) = cli.port {
        config.actuator.port = port;
    }

    log::info!(":: STRING TUNER :: Booting...");

    // No tuning is possible without the actuator, so a failed open ends here.
    let link: Box<dyn ActuatorLink> = if cli.dry_run {
        log::info!("[MAIN] Dry run: actuator commands are only logged");
        Box::new(RecordingActuator::new())
    } else {
        Box::new(SerialActuator::open(&config.actuator).context("opening actuator")?)
    };
    let actuator = Arc::new(ActuatorDispatcher::spawn(link, config.actuator.queue_capacity));

    let notifier: Box<dyn Notifier> = if cli.quiet {
        Box::new(LogNotifier)
    } else {
        Box::new(CommandNotifier::new(config.notifier.clone()))
    };
    let notifier = Arc::new(NotifyDispatcher::spawn(notifier));

    let controller = TuningController::new(&config);
    let (mut session, channels) = TuningSession::new(
        controller,
        Arc::clone(&actuator),
        Arc::clone(&notifier),
        SNAPSHOT_CAPACITY,
    );

    let (stream, sample_rate) = audio::start_audio_capture(&config.audio, move |block| {
        session.on_block(block);
    })
    .context("starting audio capture")?;
    log::info!(
        "[MAIN] Listening at {} Hz, {} strings to tune. Type 'q' + Enter or press Ctrl-C to stop.",
        sample_rate,
        config.tuning.strings.len()
    );

    // Held until the display loop returns, so neither source closing early
    // looks like a quit request.
    let (quit_tx, user_quit) = crossbeam_channel::bounded(1);
    install_interrupt_handler(quit_tx.clone());
    spawn_quit_listener(quit_tx.clone());
    let outcome = display::run(&channels, user_quit);
    drop(quit_tx);

    if let Err(e) = stream.pause() {
        log::warn!("[MAIN] Error pausing stream: {}", e);
    }
    // Dropping the stream drops the session and its handles on the workers.
    drop(stream);

    match outcome {
        display::Outcome::AllTuned => log::info!("[MAIN] All strings are tuned."),
        display::Outcome::UserQuit => {
            log::info!("[MAIN] Shutdown requested, stopping actuator");
            actuator.dispatch(ActuatorCommand::Stop);
        }
    }

    shutdown(actuator, notifier);
    log::info!("[MAIN] Finished");
    Ok(())
}

/// Joins the workers once this is the last handle on them; the actuator's
/// serial port closes when its worker exits.
fn shutdown(actuator: Arc<ActuatorDispatcher>, notifier: Arc<NotifyDispatcher>) {
    match Arc::try_unwrap(actuator) {
        Ok(actuator) => actuator.shutdown(),
        Err(_) => log::warn!("[MAIN] Actuator still shared, closing on drop"),
    }
    match Arc::try_unwrap(notifier) {
        Ok(notifier) => notifier.shutdown(),
        Err(_) => log::warn!("[MAIN] Notifier still shared, closing on drop"),
    }
}

/// Turns SIGINT into a quit request so the actuator still receives `Stop`.
fn install_interrupt_handler(tx: Sender<()>) {
    let result = ctrlc::set_handler(move || {
        // A request already pending is enough.
        let _ = tx.try_send(());
    });
    if let Err(e) = result {
        log::error!("[MAIN] Could not install Ctrl-C handler: {}", e);
    }
}

/// Watches stdin for a quit request. Closing stdin does not count as one, so
/// the tuner keeps running when started without a terminal.
fn spawn_quit_listener(tx: Sender<()>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if matches!(line.trim(), "q" | "quit" | "exit") {
                let _ = tx.try_send(());
                return;
            }
        }
    });
}
