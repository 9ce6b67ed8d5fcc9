//! Session status, notices and submission errors.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::ErrorKind;
use crate::gateway::SynthesisResult;
use crate::job::{JobError, JobId};

/// Client-visible session state.
///
/// `Ready` and `Error` are sticky display states; the next submission
/// always passes through `Busy` again.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    Idle,
    Busy(JobId),
    Ready,
    Error { kind: ErrorKind, message: String },
}

impl SessionStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionStatus::Busy(_))
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Idle => f.write_str("idle"),
            SessionStatus::Busy(id) => write!(f, "busy ({id})"),
            SessionStatus::Ready => f.write_str("ready"),
            SessionStatus::Error { kind, message } => write!(f, "error ({kind}): {message}"),
        }
    }
}

/// Handle to the most recent successful artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastResult {
    pub audio_path: PathBuf,
    pub file_name: String,
}

impl LastResult {
    /// Whether the artifact is still on disk.
    pub fn exists(&self) -> bool {
        self.audio_path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.audio_path
    }
}

impl From<&SynthesisResult> for LastResult {
    fn from(result: &SynthesisResult) -> Self {
        Self {
            audio_path: result.audio_path.clone(),
            file_name: result.file_name.clone(),
        }
    }
}

/// Outward notification produced while reducing job events.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    Progress { job_id: JobId, message: String },
    Ready(LastResult),
    Failed { kind: ErrorKind, message: String },
    Cancelled,
}

impl SessionNotice {
    /// Whether this notice ends the job it belongs to.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionNotice::Progress { .. })
    }
}

impl fmt::Display for SessionNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionNotice::Progress { job_id, message } => write!(f, "[{job_id}] {message}..."),
            SessionNotice::Ready(last) => write!(f, "Audio saved to {}", last.audio_path.display()),
            SessionNotice::Failed { kind, message } => {
                write!(f, "Synthesis failed ({kind}): {message}")
            }
            SessionNotice::Cancelled => f.write_str("Synthesis cancelled"),
        }
    }
}

/// Submissions rejected before any job is created.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Text to synthesize is empty")]
    EmptyInput,

    #[error("No reference audio selected")]
    MissingReference,

    #[error("Reference audio not found: {}", .0.display())]
    ReferenceNotFound(PathBuf),

    #[error("Another synthesis job is still running")]
    Busy,

    #[error(transparent)]
    Job(#[from] JobError),
}

impl SubmitError {
    /// Stable kind for diagnostics.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubmitError::EmptyInput => ErrorKind::EmptyInput,
            SubmitError::MissingReference => ErrorKind::MissingReference,
            SubmitError::ReferenceNotFound(_) => ErrorKind::ReferenceNotFound,
            SubmitError::Busy => ErrorKind::Busy,
            SubmitError::Job(e) => e.kind(),
        }
    }
}
