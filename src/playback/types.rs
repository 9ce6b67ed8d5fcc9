//! Playback states and engine callbacks.

use std::fmt;

use thiserror::Error;

use crate::error::ErrorKind;

/// Display state of playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Paused,
    Stopped,
    Finished,
    Error(String),
}

impl PlaybackState {
    pub fn is_error(&self) -> bool {
        matches!(self, PlaybackState::Error(_))
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Idle => f.write_str("idle"),
            PlaybackState::Loading => f.write_str("loading"),
            PlaybackState::Playing => f.write_str("playing"),
            PlaybackState::Paused => f.write_str("paused"),
            PlaybackState::Stopped => f.write_str("stopped"),
            PlaybackState::Finished => f.write_str("finished"),
            PlaybackState::Error(message) => write!(f, "error: {message}"),
        }
    }
}

/// Media status reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaStatus {
    Loading,
    Loaded,
    EndOfMedia,
    Stalled,
    Invalid,
}

/// Transport state reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Playing,
    Paused,
    Stopped,
}

/// Asynchronous callback from the playback engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    StatusChanged(MediaStatus),
    StateChanged(EngineState),
    Error { code: i32, message: String },
}

/// Errors that can occur when starting playback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("No generated audio to play")]
    NoResult,

    #[error("Playback failed: {0}")]
    Engine(String),
}

impl PlaybackError {
    /// Stable kind for diagnostics.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlaybackError::NoResult => ErrorKind::NoResult,
            PlaybackError::Engine(_) => ErrorKind::PlaybackError,
        }
    }
}
