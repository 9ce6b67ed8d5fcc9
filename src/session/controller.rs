//! Session orchestration state machine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::{Receiver, unbounded};
use tracing::{debug, error, info, warn};

use super::types::{LastResult, SessionNotice, SessionStatus, SubmitError};
use crate::backend::Gender;
use crate::gateway::{SynthesisRequest, Synthesizer};
use crate::job::{JobEvent, JobEventKind, JobHandle, JobId, JobRunner};
use crate::levels::LevelMap;
use crate::text;

/// Accepts synthesis requests from both workflows and tracks their outcome.
///
/// At most one job is in flight at a time; a second submission while one
/// is running is rejected with [`SubmitError::Busy`].
pub struct SessionController<S: Synthesizer + 'static> {
    runner: JobRunner<S>,
    events: Receiver<JobEvent>,
    levels: LevelMap,
    results_dir: PathBuf,
    current: Option<JobHandle>,
    status: SessionStatus,
    last_result: Option<LastResult>,
    backlog: Vec<SessionNotice>,
}

impl<S: Synthesizer + 'static> SessionController<S> {
    /// Create a session around a synthesizer.
    pub fn new(synthesizer: Arc<S>, levels: LevelMap, results_dir: impl Into<PathBuf>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            runner: JobRunner::new(synthesizer, tx),
            events: rx,
            levels,
            results_dir: results_dir.into(),
            current: None,
            status: SessionStatus::Idle,
            last_result: None,
            backlog: Vec::new(),
        }
    }

    /// Submit a voice cloning job.
    ///
    /// A reference transcript shorter than two characters after cleaning is
    /// treated as absent.
    pub fn submit_clone(
        &mut self,
        text: &str,
        reference_audio: &Path,
        reference_text: Option<&str>,
    ) -> Result<JobId, SubmitError> {
        let text = clean_required(text)?;

        if reference_audio.as_os_str().is_empty() {
            return Err(SubmitError::MissingReference);
        }
        if !reference_audio.exists() {
            warn!(path = %reference_audio.display(), "Reference audio does not exist");
            return Err(SubmitError::ReferenceNotFound(reference_audio.to_path_buf()));
        }

        let reference_text = Some(text::clean_opt(reference_text)).filter(|t| !t.is_empty());
        let request = SynthesisRequest::clone_voice(text, reference_audio, reference_text);
        self.admit(request)
    }

    /// Submit a parametric voice creation job.
    pub fn submit_create(
        &mut self,
        text: &str,
        gender: Gender,
        pitch_level: u8,
        speed_level: u8,
    ) -> Result<JobId, SubmitError> {
        let text = clean_required(text)?;

        let pitch = self.levels.factor(pitch_level);
        let speed = self.levels.factor(speed_level);
        debug!(
            gender = gender.as_str(),
            pitch_level,
            pitch,
            speed_level,
            speed,
            "Resolved level factors"
        );

        let request = SynthesisRequest::create_voice(text, gender, pitch, speed);
        self.admit(request)
    }

    /// Request cancellation of the current job. Returns whether one was in flight.
    pub fn cancel(&self) -> bool {
        match &self.current {
            Some(handle) => {
                self.runner.cancel(handle);
                true
            }
            None => {
                warn!("Cancel requested with no running job");
                false
            }
        }
    }

    /// Drain every queued job event without blocking.
    ///
    /// Also returns notices produced while admitting the last submission.
    pub fn pump(&mut self) -> Vec<SessionNotice> {
        let mut notices = std::mem::take(&mut self.backlog);
        while let Ok(event) = self.events.try_recv() {
            notices.extend(self.apply(event));
        }
        notices
    }

    /// Reduce one job event into session state.
    pub fn apply(&mut self, event: JobEvent) -> Option<SessionNotice> {
        let current_id = self.current.as_ref().map(JobHandle::id);
        if current_id != Some(event.job_id) {
            debug!(job_id = %event.job_id, "Ignoring event from a job that is not current");
            return None;
        }

        let notice = match event.kind {
            JobEventKind::Progress(message) => {
                debug!(job_id = %event.job_id, message = %message, "Job progress");
                return Some(SessionNotice::Progress {
                    job_id: event.job_id,
                    message,
                });
            }
            JobEventKind::Succeeded(result) => {
                let last = LastResult::from(&result);
                info!(job_id = %event.job_id, file = %last.file_name, "Synthesis ready");
                self.last_result = Some(last.clone());
                self.status = SessionStatus::Ready;
                SessionNotice::Ready(last)
            }
            JobEventKind::Failed { kind, message } => {
                error!(
                    job_id = %event.job_id,
                    kind = %kind,
                    message = %message,
                    "Synthesis failed"
                );
                self.status = SessionStatus::Error {
                    kind,
                    message: message.clone(),
                };
                SessionNotice::Failed { kind, message }
            }
            JobEventKind::Cancelled => {
                info!(job_id = %event.job_id, "Synthesis cancelled");
                self.status = SessionStatus::Idle;
                SessionNotice::Cancelled
            }
        };

        self.current = None;
        Some(notice)
    }

    /// Wait for the current job's thread to exit, then apply its events.
    ///
    /// Blocks for the rest of the inference call; only used on shutdown.
    pub fn join_current(&mut self) -> Vec<SessionNotice> {
        if let Some(handle) = self.current.as_mut() {
            handle.join();
        }
        self.pump()
    }

    /// Channel the session's job events arrive on.
    pub fn job_events(&self) -> &Receiver<JobEvent> {
        &self.events
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_job(&self) -> Option<&JobHandle> {
        self.current.as_ref()
    }

    pub fn last_result(&self) -> Option<&LastResult> {
        self.last_result.as_ref()
    }

    pub fn levels(&self) -> &LevelMap {
        &self.levels
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Folder to reveal to the user: the last artifact's directory, else the
    /// results directory when it exists.
    pub fn output_folder(&self) -> Option<PathBuf> {
        if let Some(last) = &self.last_result
            && last.exists()
        {
            return last
                .audio_path
                .parent()
                .map(|p| std::path::absolute(p).unwrap_or_else(|_| p.to_path_buf()));
        }

        if !self.results_dir.is_dir() {
            return None;
        }
        Some(std::path::absolute(&self.results_dir).unwrap_or_else(|_| self.results_dir.clone()))
    }

    fn admit(&mut self, request: SynthesisRequest) -> Result<JobId, SubmitError> {
        // A job whose terminal event is already queued is not running.
        while let Ok(event) = self.events.try_recv() {
            if let Some(notice) = self.apply(event) {
                self.backlog.push(notice);
            }
        }

        if let Some(handle) = &self.current {
            warn!(job_id = %handle.id(), "Rejecting submission while a job is running");
            return Err(SubmitError::Busy);
        }

        let handle = self.runner.start(request)?;
        let id = handle.id();
        self.current = Some(handle);
        self.status = SessionStatus::Busy(id);

        Ok(id)
    }
}

fn clean_required(text: &str) -> Result<String, SubmitError> {
    let cleaned = text::clean(text);
    if cleaned.is_empty() {
        return Err(SubmitError::EmptyInput);
    }
    Ok(cleaned)
}
