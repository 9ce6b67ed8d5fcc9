//! Playback engine backed by an external player program.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::PlaybackEngine;
use super::types::{EngineState, MediaStatus, PlaybackError, PlayerEvent};

/// How often the watcher thread polls the player process.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Plays files by spawning a player such as `aplay` or `afplay`.
///
/// Callbacks are sent on the channel given at construction; a watcher
/// thread reports end of media or failure when the process exits.
pub struct CommandPlayer {
    program: String,
    events: Sender<PlayerEvent>,
    source: Option<PathBuf>,
    child: Arc<Mutex<Option<Child>>>,
    generation: Arc<AtomicU64>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, events: Sender<PlayerEvent>) -> Self {
        Self {
            program: program.into(),
            events,
            source: None,
            child: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn emit(&self, event: PlayerEvent) {
        send(&self.events, event);
    }

    fn kill_child(&self) -> bool {
        // Invalidate any watcher still polling the old process.
        self.generation.fetch_add(1, Ordering::SeqCst);

        let Some(mut child) = self.child.lock().take() else {
            return false;
        };
        if let Err(e) = child.kill() {
            debug!(error = %e, "Player process already exited");
        }
        let _ = child.wait();
        true
    }
}

impl PlaybackEngine for CommandPlayer {
    fn load(&mut self, path: &Path) -> Result<(), PlaybackError> {
        self.emit(PlayerEvent::StatusChanged(MediaStatus::Loading));

        if !path.is_file() {
            self.source = None;
            self.emit(PlayerEvent::StatusChanged(MediaStatus::Invalid));
            return Err(PlaybackError::Engine(format!(
                "Not a playable file: {}",
                path.display()
            )));
        }

        self.source = Some(path.to_path_buf());
        self.emit(PlayerEvent::StatusChanged(MediaStatus::Loaded));
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| PlaybackError::Engine("No media loaded".to_string()))?;

        self.kill_child();

        let child = Command::new(&self.program)
            .arg(&source)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                let message = format!("Failed to start player '{}': {e}", self.program);
                self.emit(PlayerEvent::Error {
                    code: e.raw_os_error().unwrap_or(-1),
                    message: message.clone(),
                });
                PlaybackError::Engine(message)
            })?;

        let generation = self.generation.load(Ordering::SeqCst);
        *self.child.lock() = Some(child);
        self.emit(PlayerEvent::StateChanged(EngineState::Playing));

        let watcher = Watcher {
            program: self.program.clone(),
            events: self.events.clone(),
            child: Arc::clone(&self.child),
            generation: Arc::clone(&self.generation),
            expected: generation,
        };

        thread::Builder::new()
            .name("player-watch".to_string())
            .spawn(move || watcher.run())
            .map_err(|e| {
                self.kill_child();
                PlaybackError::Engine(format!("Failed to watch player: {e}"))
            })?;

        Ok(())
    }

    fn stop(&mut self) {
        if self.kill_child() {
            self.emit(PlayerEvent::StateChanged(EngineState::Stopped));
        }
    }
}

impl Drop for CommandPlayer {
    fn drop(&mut self) {
        self.kill_child();
    }
}

/// Polls one player process until it exits or is superseded.
struct Watcher {
    program: String,
    events: Sender<PlayerEvent>,
    child: Arc<Mutex<Option<Child>>>,
    generation: Arc<AtomicU64>,
    expected: u64,
}

impl Watcher {
    fn run(self) {
        loop {
            thread::sleep(POLL_INTERVAL);

            let mut slot = self.child.lock();
            if self.generation.load(Ordering::SeqCst) != self.expected {
                return;
            }
            let Some(child) = slot.as_mut() else {
                return;
            };

            match child.try_wait() {
                Ok(None) => continue,
                Ok(Some(status)) => {
                    slot.take();
                    drop(slot);

                    if status.success() {
                        send(&self.events, PlayerEvent::StatusChanged(MediaStatus::EndOfMedia));
                        send(&self.events, PlayerEvent::StateChanged(EngineState::Stopped));
                    } else {
                        send(
                            &self.events,
                            PlayerEvent::Error {
                                code: status.code().unwrap_or(-1),
                                message: format!("{} exited with {status}", self.program),
                            },
                        );
                    }
                    return;
                }
                Err(e) => {
                    slot.take();
                    drop(slot);
                    send(
                        &self.events,
                        PlayerEvent::Error {
                            code: e.raw_os_error().unwrap_or(-1),
                            message: format!("Lost track of player process: {e}"),
                        },
                    );
                    return;
                }
            }
        }
    }
}

fn send(events: &Sender<PlayerEvent>, event: PlayerEvent) {
    if events.send(event).is_err() {
        warn!("Player event receiver dropped");
    }
}
