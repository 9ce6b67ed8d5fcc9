//! Playback of generated audio.
//!
//! The controller is a state machine fed by engine callbacks; the engine
//! itself is behind a trait so the state machine can be driven by mocks.

mod command;
mod controller;
mod types;

pub use command::CommandPlayer;
pub use controller::PlaybackController;
pub use types::{EngineState, MediaStatus, PlaybackError, PlaybackState, PlayerEvent};

use std::path::Path;

/// Trait for the audio output engine.
///
/// Implementations report progress asynchronously as [`PlayerEvent`]s.
#[cfg_attr(test, mockall::automock)]
pub trait PlaybackEngine: Send {
    /// Set the file to play.
    fn load(&mut self, path: &Path) -> Result<(), PlaybackError>;

    /// Start playing the loaded file.
    fn play(&mut self) -> Result<(), PlaybackError>;

    /// Stop playing. Safe to call when nothing is playing.
    fn stop(&mut self);
}
