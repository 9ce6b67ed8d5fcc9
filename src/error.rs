//! Stable error kinds shared across the crate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable classification of every failure the application can report.
///
/// Error types carry human-readable messages; this kind is what logs and
/// callers match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    EmptyInput,
    MissingReference,
    ReferenceNotFound,
    Busy,
    InferenceFailure,
    ModelContractMismatch,
    FileMissing,
    UnexpectedError,
    PlaybackError,
    NoResult,
}

impl ErrorKind {
    /// Returns the identifier used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::EmptyInput => "EmptyInput",
            ErrorKind::MissingReference => "MissingReference",
            ErrorKind::ReferenceNotFound => "ReferenceNotFound",
            ErrorKind::Busy => "Busy",
            ErrorKind::InferenceFailure => "InferenceFailure",
            ErrorKind::ModelContractMismatch => "ModelContractMismatch",
            ErrorKind::FileMissing => "FileMissing",
            ErrorKind::UnexpectedError => "UnexpectedError",
            ErrorKind::PlaybackError => "PlaybackError",
            ErrorKind::NoResult => "NoResult",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
