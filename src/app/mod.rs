//! Interactive front end.
//!
//! Ties a session and a playback controller to a line-oriented shell and
//! implements the shutdown policy.

mod command;
mod oneshot;
mod shell;

pub use command::{CommandError, HELP, ShellCommand};
pub use oneshot::{play_to_end, wait_for_outcome};
pub use shell::{App, Flow, run_shell, spawn_line_reader};
