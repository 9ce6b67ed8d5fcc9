//! Blocking helpers for the one-shot `clone` and `create` commands.

use std::io::{self, Write};

use crossbeam_channel::Receiver;

use crate::gateway::Synthesizer;
use crate::playback::{
    PlaybackController, PlaybackEngine, PlaybackError, PlaybackState, PlayerEvent,
};
use crate::session::{LastResult, SessionController, SessionNotice};

/// Print job progress until the current job ends, and return its outcome.
pub fn wait_for_outcome<S: Synthesizer + 'static>(
    session: &mut SessionController<S>,
    out: &mut impl Write,
) -> io::Result<SessionNotice> {
    for notice in session.pump() {
        writeln!(out, "{notice}")?;
        if notice.is_terminal() {
            return Ok(notice);
        }
    }

    loop {
        let event = session
            .job_events()
            .recv()
            .map_err(|_| io::Error::other("job event channel closed"))?;

        if let Some(notice) = session.apply(event) {
            writeln!(out, "{notice}")?;
            if notice.is_terminal() {
                return Ok(notice);
            }
        }
    }
}

/// Play the last result and block until playback ends.
///
/// Returns the final state: finished, stopped, or an error.
pub fn play_to_end<E: PlaybackEngine>(
    playback: &mut PlaybackController<E>,
    last: Option<&LastResult>,
    events: &Receiver<PlayerEvent>,
) -> Result<PlaybackState, PlaybackError> {
    playback.play(last)?;

    while let Ok(event) = events.recv() {
        if let Some(state) = playback.handle(event)
            && matches!(
                state,
                PlaybackState::Finished | PlaybackState::Stopped | PlaybackState::Error(_)
            )
        {
            return Ok(state);
        }
    }

    Ok(playback.state().clone())
}
