//! Background execution of synthesis jobs.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::types::{JobError, JobEvent, JobEventKind, JobId, JobStatus, classify};
use crate::error::ErrorKind;
use crate::gateway::{SynthesisRequest, Synthesizer};

/// Progress message emitted before the pre-dispatch cancellation check.
pub const PROGRESS_PREPARING: &str = "Preparing inference";

/// Progress message emitted immediately before the gateway call.
pub const PROGRESS_RUNNING: &str = "Running inference";

/// Handle to one in-flight or completed job.
pub struct JobHandle {
    id: JobId,
    request: SynthesisRequest,
    cancel_requested: Arc<AtomicBool>,
    status: Arc<Mutex<JobStatus>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn request(&self) -> &SynthesisRequest {
        &self.request
    }

    pub fn status(&self) -> JobStatus {
        *self.status.lock()
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    /// Set the cancellation flag. Returns `true` only for the call that set it.
    pub(crate) fn request_cancel(&self) -> bool {
        !self.cancel_requested.swap(true, Ordering::SeqCst)
    }

    /// Whether the background thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Wait for the background thread to exit.
    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            error!(job_id = %self.id, "Job thread panicked");
        }
    }
}

/// Everything the background thread needs to run one job.
pub(crate) struct JobContext<S: Synthesizer> {
    id: JobId,
    request: SynthesisRequest,
    synthesizer: Arc<S>,
    events: Sender<JobEvent>,
    cancel_requested: Arc<AtomicBool>,
    status: Arc<Mutex<JobStatus>>,
}

impl<S: Synthesizer> JobContext<S> {
    /// Run the job to its terminal event.
    ///
    /// Cancellation is checked right before the gateway call and right after
    /// it returns; the call itself is never interrupted.
    pub(crate) fn run(self) {
        self.set_status(JobStatus::Running);
        self.emit(JobEventKind::Progress(PROGRESS_PREPARING.to_string()));

        if self.is_cancelled() {
            info!(job_id = %self.id, "Job cancelled before dispatch");
            self.finish(JobStatus::Cancelled, JobEventKind::Cancelled);
            return;
        }

        self.emit(JobEventKind::Progress(PROGRESS_RUNNING.to_string()));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.synthesizer.synthesize(&self.request)
        }));

        if self.is_cancelled() {
            info!(job_id = %self.id, "Job cancelled during inference");
            if let Ok(Ok(result)) = &outcome {
                discard_artifact(self.id, &result.audio_path);
            }
            self.finish(JobStatus::Cancelled, JobEventKind::Cancelled);
            return;
        }

        match outcome {
            Ok(Ok(result)) => {
                info!(job_id = %self.id, path = %result.audio_path.display(), "Job succeeded");
                self.finish(JobStatus::Succeeded, JobEventKind::Succeeded(result));
            }
            Ok(Err(err)) => {
                let kind = classify(&err);
                error!(job_id = %self.id, kind = %kind, error = %err, "Job failed");
                self.finish(
                    JobStatus::Failed,
                    JobEventKind::Failed {
                        kind,
                        message: err.to_string(),
                    },
                );
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(job_id = %self.id, message = %message, "Synthesis panicked");
                self.finish(
                    JobStatus::Failed,
                    JobEventKind::Failed {
                        kind: ErrorKind::UnexpectedError,
                        message: format!("Unexpected error during synthesis: {message}"),
                    },
                );
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    fn set_status(&self, status: JobStatus) {
        debug!(job_id = %self.id, status = ?status, "Job status changed");
        *self.status.lock() = status;
    }

    fn finish(&self, status: JobStatus, kind: JobEventKind) {
        self.set_status(status);
        self.emit(kind);
    }

    fn emit(&self, kind: JobEventKind) {
        let event = JobEvent {
            job_id: self.id,
            kind,
        };
        if self.events.send(event).is_err() {
            warn!(job_id = %self.id, "Job event receiver dropped");
        }
    }
}

/// Starts jobs on fresh background threads and relays their events.
///
/// The runner does not limit concurrency; callers admit one job at a time.
pub struct JobRunner<S: Synthesizer + 'static> {
    synthesizer: Arc<S>,
    events: Sender<JobEvent>,
    next_id: AtomicU64,
}

impl<S: Synthesizer + 'static> JobRunner<S> {
    /// Create a runner that reports every job's events on `events`.
    pub fn new(synthesizer: Arc<S>, events: Sender<JobEvent>) -> Self {
        Self {
            synthesizer,
            events,
            next_id: AtomicU64::new(1),
        }
    }

    /// Start `request` on a new background thread.
    pub fn start(&self, request: SynthesisRequest) -> Result<JobHandle, JobError> {
        let (mut handle, context) = self.prepare(request);

        info!(
            job_id = %handle.id,
            workflow = handle.request.workflow_name(),
            "Starting job"
        );
        let thread = thread::Builder::new()
            .name(format!("tts-{}", handle.id))
            .spawn(move || context.run())?;

        handle.thread = Some(thread);
        Ok(handle)
    }

    /// Request cooperative cancellation of a job.
    pub fn cancel(&self, handle: &JobHandle) {
        if handle.request_cancel() {
            info!(job_id = %handle.id, "Job marked for cancellation");
        } else {
            debug!(job_id = %handle.id, "Job already marked for cancellation");
        }
    }

    /// Build a pending handle and the context its thread will run.
    pub(crate) fn prepare(&self, request: SynthesisRequest) -> (JobHandle, JobContext<S>) {
        let id = JobId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let cancel_requested = Arc::new(AtomicBool::new(false));
        let status = Arc::new(Mutex::new(JobStatus::Pending));

        let context = JobContext {
            id,
            request: request.clone(),
            synthesizer: Arc::clone(&self.synthesizer),
            events: self.events.clone(),
            cancel_requested: Arc::clone(&cancel_requested),
            status: Arc::clone(&status),
        };

        let handle = JobHandle {
            id,
            request,
            cancel_requested,
            status,
            thread: None,
        };

        (handle, context)
    }
}

/// Delete an artifact produced by a cancelled job; failures are only logged.
fn discard_artifact(id: JobId, path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => info!(job_id = %id, path = %path.display(), "Deleted artifact of cancelled job"),
        Err(e) => warn!(
            job_id = %id,
            path = %path.display(),
            error = %e,
            "Could not delete artifact of cancelled job"
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
