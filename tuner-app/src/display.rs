//! Console rendering of the tuner state.

use crossbeam_channel::{Receiver, select};
use tuner_core::DisplaySnapshot;
use tuner_core::session::SessionChannels;

/// Why the display loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    AllTuned,
    UserQuit,
}

/// Renders snapshots until every string is tuned or the user quits.
pub fn run(channels: &SessionChannels, user_quit: Receiver<()>) -> Outcome {
    loop {
        select! {
            recv(channels.snapshots) -> msg => match msg {
                Ok(snapshot) => log::info!("[DISPLAY] {}", render(&snapshot)),
                Err(_) => {
                    log::warn!("[DISPLAY] Session closed");
                    return Outcome::UserQuit;
                }
            },
            recv(channels.finished) -> _ => {
                // Show whatever the last cycles left behind.
                for snapshot in channels.snapshots.try_iter() {
                    log::info!("[DISPLAY] {}", render(&snapshot));
                }
                return Outcome::AllTuned;
            },
            recv(user_quit) -> _ => return Outcome::UserQuit,
        }
    }
}

/// One status line for a snapshot.
pub fn render(snapshot: &DisplaySnapshot) -> String {
    let note = match (&snapshot.note_name, snapshot.cents_deviation) {
        (Some(name), Some(cents)) => format!("{name} ({cents:+.0} cents)"),
        (Some(name), None) => name.clone(),
        _ => "-".to_string(),
    };
    format!(
        "String {}/{} {} | Closest Note: {} | Detected Frequency: {} Hz | Target Frequency: {}/{} Hz | {}",
        snapshot.string_index + 1,
        snapshot.string_count,
        snapshot.string_name,
        note,
        snapshot.detected_hz,
        snapshot.target_low_hz,
        snapshot.target_high_hz,
        snapshot.status,
    )
}
