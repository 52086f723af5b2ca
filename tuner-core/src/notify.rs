//! # Notification Module
//!
//! Audible feedback when strings are tuned. Notifications are fire-and-forget:
//! they run on their own worker thread and nothing waits for them.

use crossbeam_channel::Sender;
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};

use crate::config::NotifierConfig;

/// Progress events worth announcing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyEvent {
    StringTuned { name: String },
    AllTuned,
}

/// Receiver of progress events.
pub trait Notifier: Send {
    fn notify(&mut self, event: &NotifyEvent);
}

/// Announces events by running external programs: a speech synthesizer that
/// reads a phrase from stdin, and an optional sound player.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    config: NotifierConfig,
}

impl CommandNotifier {
    pub fn new(config: NotifierConfig) -> Self {
        Self { config }
    }

    fn speak(&self, phrase: &str) {
        let Some((program, args)) = self.config.speech_command.split_first() else {
            return;
        };
        let spawned = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(mut child) => {
                if let Some(mut stdin) = child.stdin.take() {
                    if let Err(e) = stdin.write_all(phrase.as_bytes()) {
                        log::warn!("[NOTIFY] Could not pass phrase to {}: {}", program, e);
                    }
                }
                if let Err(e) = child.wait() {
                    log::warn!("[NOTIFY] {} did not finish: {}", program, e);
                }
            }
            Err(e) => log::warn!("[NOTIFY] Could not start {}: {}", program, e),
        }
    }

    fn play_sound(&self) {
        let Some((program, args)) = self.config.sound_command.split_first() else {
            return;
        };
        match Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if !status.success() => {
                log::warn!("[NOTIFY] {} exited with {}", program, status)
            }
            Ok(_) => {}
            Err(e) => log::warn!("[NOTIFY] Could not start {}: {}", program, e),
        }
    }
}

impl Notifier for CommandNotifier {
    fn notify(&mut self, event: &NotifyEvent) {
        if !self.config.enabled {
            return;
        }
        match event {
            NotifyEvent::StringTuned { .. } => {
                self.speak(&self.config.tuned_phrase);
                self.play_sound();
            }
            NotifyEvent::AllTuned => self.speak(&self.config.all_tuned_phrase),
        }
    }
}

/// Notifier that only logs, for runs without audio output.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, event: &NotifyEvent) {
        match event {
            NotifyEvent::StringTuned { name } => log::info!("[NOTIFY] {} tuned", name),
            NotifyEvent::AllTuned => log::info!("[NOTIFY] All strings are tuned"),
        }
    }
}

/// Runs a `Notifier` on a worker thread fed by an unbounded queue.
pub struct NotifyDispatcher {
    tx: Option<Sender<NotifyEvent>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl NotifyDispatcher {
    pub fn spawn(mut notifier: Box<dyn Notifier>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded::<NotifyEvent>();
        let thread_handle = thread::spawn(move || {
            for event in rx.iter() {
                notifier.notify(&event);
            }
        });
        Self {
            tx: Some(tx),
            thread_handle: Some(thread_handle),
        }
    }

    /// Queues an event; never blocks.
    pub fn dispatch(&self, event: NotifyEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                log::warn!("[NOTIFY] Worker gone, event dropped");
            }
        }
    }

    /// Finishes pending announcements and stops the worker.
    pub fn shutdown(mut self) {
        self.stop_worker();
    }

    fn stop_worker(&mut self) {
        // Closing the channel ends the worker loop once it is drained.
        self.tx.take();
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("[NOTIFY] Worker panicked");
            }
        }
    }
}

impl Drop for NotifyDispatcher {
    fn drop(&mut self) {
        self.stop_worker();
    }
}
