//! Job identifiers, statuses and lifecycle events.

use std::fmt;

use thiserror::Error;

use crate::error::ErrorKind;
use crate::gateway::{GatewayError, SynthesisResult};

/// Opaque identifier of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub(crate) u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Cancelled,
    Succeeded,
    Failed,
}

/// Payload of a job event.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEventKind {
    Progress(String),
    Succeeded(SynthesisResult),
    Failed { kind: ErrorKind, message: String },
    Cancelled,
}

/// One message from a job's background thread.
#[derive(Debug, Clone, PartialEq)]
pub struct JobEvent {
    pub job_id: JobId,
    pub kind: JobEventKind,
}

impl JobEvent {
    /// Whether this is the single terminal event of its job.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, JobEventKind::Progress(_))
    }
}

/// Errors that can occur when starting a job.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Failed to spawn job thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl JobError {
    /// Stable kind for diagnostics.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::UnexpectedError
    }
}

/// Classify a gateway failure into the kind reported on the `failed` event.
pub fn classify(err: &GatewayError) -> ErrorKind {
    match err.kind() {
        ErrorKind::ReferenceNotFound | ErrorKind::FileMissing => ErrorKind::FileMissing,
        ErrorKind::InferenceFailure => ErrorKind::InferenceFailure,
        ErrorKind::ModelContractMismatch => ErrorKind::ModelContractMismatch,
        _ => ErrorKind::UnexpectedError,
    }
}
