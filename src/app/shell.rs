//! Interactive shell over a session and a playback controller.

use std::io::{self, BufRead, Write};
use std::process::Command;
use std::thread;

use crossbeam_channel::{Receiver, select, unbounded};
use tracing::{debug, info, warn};

use super::command::{HELP, ShellCommand};
use crate::gateway::Synthesizer;
use crate::job::{JobEvent, JobId};
use crate::playback::{PlaybackController, PlaybackEngine, PlayerEvent};
use crate::session::{SessionController, SessionNotice, SubmitError};

/// What the shell loop should do after handling input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// A job is in flight; the next line answers the exit prompt.
    ConfirmExit,
    Exit,
}

/// Shell state: the session, playback, and where output goes.
pub struct App<S: Synthesizer + 'static, E: PlaybackEngine, W: Write> {
    session: SessionController<S>,
    playback: PlaybackController<E>,
    out: W,
    opener: Option<String>,
}

impl<S: Synthesizer + 'static, E: PlaybackEngine, W: Write> App<S, E, W> {
    pub fn new(session: SessionController<S>, playback: PlaybackController<E>, out: W) -> Self {
        Self {
            session,
            playback,
            out,
            opener: None,
        }
    }

    /// Program used by `open` to reveal the output folder.
    pub fn with_opener(mut self, program: impl Into<String>) -> Self {
        self.opener = Some(program.into());
        self
    }

    pub fn session(&self) -> &SessionController<S> {
        &self.session
    }

    pub fn playback(&self) -> &PlaybackController<E> {
        &self.playback
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn prompt(&mut self) -> io::Result<()> {
        write!(self.out, "> ")?;
        self.out.flush()
    }

    /// Run one parsed command.
    pub fn execute(&mut self, command: ShellCommand) -> io::Result<Flow> {
        match command {
            ShellCommand::Clone {
                reference,
                text,
                reference_text,
            } => {
                let submitted =
                    self.session
                        .submit_clone(&text, &reference, reference_text.as_deref());
                self.report_submission(submitted)?;
            }
            ShellCommand::Create {
                gender,
                pitch,
                speed,
                text,
            } => {
                let submitted = self.session.submit_create(&text, gender, pitch, speed);
                self.report_submission(submitted)?;
            }
            ShellCommand::Cancel => {
                if self.session.cancel() {
                    writeln!(self.out, "Cancellation requested")?;
                } else {
                    writeln!(self.out, "No synthesis is running")?;
                }
            }
            ShellCommand::Play => match self.playback.play(self.session.last_result()) {
                Ok(()) => {
                    if let Some(last) = self.session.last_result() {
                        writeln!(self.out, "Playing {}", last.file_name)?;
                    }
                }
                Err(e) => writeln!(self.out, "{e}")?,
            },
            ShellCommand::Stop => self.playback.stop(),
            ShellCommand::Status => self.print_status()?,
            ShellCommand::Open => self.open_output_folder()?,
            ShellCommand::Help => writeln!(self.out, "{HELP}")?,
            ShellCommand::Quit => return self.begin_close(),
            ShellCommand::Empty => {}
        }
        Ok(Flow::Continue)
    }

    /// Reduce a job event and print what it means.
    pub fn on_job_event(&mut self, event: JobEvent) -> io::Result<()> {
        if let Some(notice) = self.session.apply(event) {
            self.report(notice)?;
        }
        Ok(())
    }

    pub fn on_player_event(&mut self, event: PlayerEvent) -> io::Result<()> {
        if let Some(state) = self.playback.handle(event) {
            writeln!(self.out, "Playback: {state}")?;
        }
        Ok(())
    }

    /// Start shutting down.
    ///
    /// Playback stops regardless of what happens next. With a job in flight
    /// the user is asked whether to cancel it, and [`Flow::ConfirmExit`] is
    /// returned.
    pub fn begin_close(&mut self) -> io::Result<Flow> {
        self.playback.shutdown();

        let notices = self.session.pump();
        self.report_all(notices)?;

        if !self.session.is_busy() {
            info!("Closing session");
            return Ok(Flow::Exit);
        }

        write!(
            self.out,
            "A synthesis job is still running. Cancel it and exit? [y/N] "
        )?;
        self.out.flush()?;
        Ok(Flow::ConfirmExit)
    }

    /// Answer the exit prompt. `None` means input ended, which counts as yes.
    ///
    /// On yes the job is cancelled and its thread joined before returning
    /// [`Flow::Exit`].
    pub fn confirm_close(&mut self, answer: Option<&str>) -> io::Result<Flow> {
        let confirmed = answer.is_none_or(|a| {
            matches!(a.trim().to_ascii_lowercase().as_str(), "y" | "yes")
        });

        if !confirmed {
            writeln!(self.out, "Continuing")?;
            return Ok(Flow::Continue);
        }

        if self.session.cancel() {
            writeln!(self.out, "Waiting for the running job to stop...")?;
        }
        let notices = self.session.join_current();
        self.report_all(notices)?;

        info!("Closing session");
        Ok(Flow::Exit)
    }

    fn report_submission(&mut self, submitted: Result<JobId, SubmitError>) -> io::Result<()> {
        let notices = self.session.pump();
        self.report_all(notices)?;

        match submitted {
            Ok(id) => writeln!(self.out, "Submitted {id}"),
            Err(e) => {
                debug!(kind = %e.kind(), "Submission rejected");
                writeln!(self.out, "Cannot start synthesis: {e}")
            }
        }
    }

    fn report(&mut self, notice: SessionNotice) -> io::Result<()> {
        writeln!(self.out, "{notice}")?;
        if matches!(notice, SessionNotice::Ready(_)) {
            writeln!(self.out, "Type 'play' to listen")?;
        }
        Ok(())
    }

    fn report_all(&mut self, notices: Vec<SessionNotice>) -> io::Result<()> {
        notices.into_iter().try_for_each(|notice| self.report(notice))
    }

    fn print_status(&mut self) -> io::Result<()> {
        writeln!(self.out, "Session:  {}", self.session.status())?;
        let last = self.session.last_result();
        let playable = if self.playback.can_play(last) { "yes" } else { "no" };
        writeln!(
            self.out,
            "Playback: {} (play available: {playable})",
            self.playback.state()
        )?;
        writeln!(self.out, "Levels:   {}", self.session.levels().source())?;
        match self.session.last_result() {
            Some(last) if last.exists() => writeln!(self.out, "Last:     {}", last.file_name),
            Some(last) => writeln!(self.out, "Last:     {} (missing)", last.file_name),
            None => writeln!(self.out, "Last:     none"),
        }
    }

    fn open_output_folder(&mut self) -> io::Result<()> {
        let Some(folder) = self.session.output_folder() else {
            return writeln!(self.out, "No output folder yet");
        };
        writeln!(self.out, "Output folder: {}", folder.display())?;

        let Some(opener) = &self.opener else {
            return Ok(());
        };
        match Command::new(opener).arg(&folder).spawn() {
            Ok(mut child) => {
                // Reap the opener without blocking the shell.
                if let Err(e) = thread::Builder::new()
                    .name("folder-opener".to_string())
                    .spawn(move || child.wait())
                {
                    warn!(error = %e, "Failed to start folder opener reaper");
                }
            }
            Err(e) => warn!(program = %opener, error = %e, "Failed to open output folder"),
        }
        Ok(())
    }
}

/// Read lines on a dedicated thread. The channel closes at end of input.
pub fn spawn_line_reader<R: BufRead + Send + 'static>(reader: R) -> io::Result<Receiver<String>> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else {
                    break;
                };
                if tx.send(line).is_err() {
                    break;
                }
            }
            debug!("Input closed");
        })?;
    Ok(rx)
}

/// Drive the shell until the user exits.
///
/// Input lines, job events and player events are multiplexed so inference
/// never blocks the prompt.
pub fn run_shell<S, E, W>(
    app: &mut App<S, E, W>,
    lines: &Receiver<String>,
    player_events: &Receiver<PlayerEvent>,
) -> io::Result<()>
where
    S: Synthesizer + 'static,
    E: PlaybackEngine,
    W: Write,
{
    let job_events = app.session().job_events().clone();
    let mut confirming = false;
    app.prompt()?;

    loop {
        select! {
            recv(lines) -> line => {
                let flow = match (line, confirming) {
                    (Ok(line), true) => app.confirm_close(Some(&line))?,
                    (Ok(line), false) => match ShellCommand::parse(&line) {
                        Ok(command) => app.execute(command)?,
                        Err(e) => {
                            writeln!(app.out, "{e}")?;
                            Flow::Continue
                        }
                    },
                    (Err(_), true) => app.confirm_close(None)?,
                    (Err(_), false) => match app.begin_close()? {
                        Flow::ConfirmExit => app.confirm_close(None)?,
                        flow => flow,
                    },
                };

                match flow {
                    Flow::Exit => return Ok(()),
                    Flow::ConfirmExit => confirming = true,
                    Flow::Continue => {
                        confirming = false;
                        app.prompt()?;
                    }
                }
            }
            recv(job_events) -> event => {
                if let Ok(event) = event {
                    app.on_job_event(event)?;
                }
            }
            recv(player_events) -> event => {
                if let Ok(event) = event {
                    app.on_player_event(event)?;
                }
            }
        }
    }
}
