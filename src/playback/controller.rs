//! Playback state machine.

use tracing::{debug, error, info, warn};

use super::PlaybackEngine;
use super::types::{EngineState, MediaStatus, PlaybackError, PlaybackState, PlayerEvent};
use crate::session::LastResult;

/// Tracks playback of the last produced artifact.
///
/// Engine callbacks are fed through [`handle`](Self::handle) in arrival
/// order. An error stays displayed until the next successful `play()`.
pub struct PlaybackController<E: PlaybackEngine> {
    engine: E,
    state: PlaybackState,
}

impl<E: PlaybackEngine> PlaybackController<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            state: PlaybackState::Idle,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Whether `play()` would have something to play.
    pub fn can_play(&self, last: Option<&LastResult>) -> bool {
        last.is_some_and(LastResult::exists)
            && !matches!(self.state, PlaybackState::Loading | PlaybackState::Playing)
    }

    /// Start playing the last result from the beginning.
    ///
    /// Without a result on disk this returns [`PlaybackError::NoResult`]
    /// and does not touch the engine or the state.
    pub fn play(&mut self, last: Option<&LastResult>) -> Result<(), PlaybackError> {
        let Some(last) = last.filter(|r| r.exists()) else {
            warn!("Nothing to play: no generated audio on disk");
            return Err(PlaybackError::NoResult);
        };

        info!(path = %last.audio_path.display(), "Starting playback");
        self.engine.stop();

        let started = self
            .engine
            .load(last.path())
            .and_then(|()| self.engine.play());

        match started {
            Ok(()) => {
                self.state = PlaybackState::Loading;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Playback engine refused to start");
                self.state = PlaybackState::Error(e.to_string());
                Err(e)
            }
        }
    }

    /// Stop playback. Does nothing when already stopped or idle.
    ///
    /// A finished or failed playback keeps its display state.
    pub fn stop(&mut self) {
        match self.state {
            PlaybackState::Idle | PlaybackState::Stopped => {
                debug!("Stop ignored, playback not active");
            }
            PlaybackState::Loading | PlaybackState::Playing | PlaybackState::Paused => {
                self.engine.stop();
                self.state = PlaybackState::Stopped;
                info!("Playback stopped");
            }
            PlaybackState::Finished | PlaybackState::Error(_) => self.engine.stop(),
        }
    }

    /// Stop the engine regardless of state.
    pub fn shutdown(&mut self) {
        self.engine.stop();
    }

    /// Reduce one engine callback. Returns the new state if it changed.
    pub fn handle(&mut self, event: PlayerEvent) -> Option<PlaybackState> {
        let next = match event {
            PlayerEvent::Error { code, message } => {
                error!(code, message = %message, "Playback engine error");
                PlaybackState::Error(message)
            }
            _ if self.state.is_error() => {
                debug!(event = ?event, "Keeping error state");
                return None;
            }
            PlayerEvent::StatusChanged(status) => match status {
                MediaStatus::Loading => PlaybackState::Loading,
                MediaStatus::Loaded => return None,
                MediaStatus::EndOfMedia => PlaybackState::Finished,
                MediaStatus::Stalled => {
                    warn!("Playback stalled");
                    return None;
                }
                MediaStatus::Invalid => {
                    PlaybackState::Error("The audio file cannot be played".to_string())
                }
            },
            PlayerEvent::StateChanged(state) => match state {
                EngineState::Playing => PlaybackState::Playing,
                EngineState::Paused => PlaybackState::Paused,
                // Finished outranks the trailing stop; while loading, a stop
                // belongs to the player that play() replaced.
                EngineState::Stopped
                    if matches!(self.state, PlaybackState::Finished | PlaybackState::Loading) =>
                {
                    return None;
                }
                EngineState::Stopped => PlaybackState::Stopped,
            },
        };

        if next == self.state {
            return None;
        }

        debug!(from = %self.state, to = %next, "Playback state changed");
        self.state = next.clone();
        Some(next)
    }
}
