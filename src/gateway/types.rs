//! Synthesis request and result types.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{Gender, ModelError};
use crate::error::ErrorKind;

/// Minimum reference transcript length, in characters, worth sending.
pub const MIN_REFERENCE_TEXT_CHARS: usize = 2;

/// Errors surfaced by the inference gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Reference audio not found: {}", .0.display())]
    ReferenceNotFound(PathBuf),

    #[error("Inference failed: {0}")]
    InferenceFailure(String),

    #[error("Model contract mismatch: {0}")]
    ModelContractMismatch(String),

    #[error("Model error: {0}")]
    ModelError(ModelError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("WAV encoding error: {0}")]
    WavError(#[from] hound::Error),
}

impl From<ModelError> for GatewayError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::ContractMismatch(msg) => GatewayError::ModelContractMismatch(msg),
            other => GatewayError::ModelError(other),
        }
    }
}

impl GatewayError {
    /// Stable kind for diagnostics.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::ReferenceNotFound(_) => ErrorKind::ReferenceNotFound,
            GatewayError::InferenceFailure(_) => ErrorKind::InferenceFailure,
            GatewayError::ModelContractMismatch(_) => ErrorKind::ModelContractMismatch,
            GatewayError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ErrorKind::FileMissing
            }
            _ => ErrorKind::UnexpectedError,
        }
    }
}

/// Which of the two workflows a request drives.
///
/// The variants are exclusive: a request either clones a reference voice
/// or creates one from controls, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Workflow {
    Clone {
        reference_audio: PathBuf,
        reference_text: Option<String>,
    },
    Create {
        gender: Gender,
        pitch: f32,
        speed: f32,
    },
}

/// One immutable synthesis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub workflow: Workflow,
}

impl SynthesisRequest {
    /// Request cloning the timbre of a reference clip.
    ///
    /// A reference transcript shorter than two characters is dropped.
    pub fn clone_voice(
        text: impl Into<String>,
        reference_audio: impl Into<PathBuf>,
        reference_text: Option<String>,
    ) -> Self {
        Self {
            text: text.into(),
            workflow: Workflow::Clone {
                reference_audio: reference_audio.into(),
                reference_text: reference_text
                    .filter(|t| t.chars().count() >= MIN_REFERENCE_TEXT_CHARS),
            },
        }
    }

    /// Request a voice built from gender, pitch and speed factors.
    pub fn create_voice(text: impl Into<String>, gender: Gender, pitch: f32, speed: f32) -> Self {
        Self {
            text: text.into(),
            workflow: Workflow::Create {
                gender,
                pitch,
                speed,
            },
        }
    }

    /// Reference clip, for clone requests.
    pub fn reference_audio(&self) -> Option<&Path> {
        match &self.workflow {
            Workflow::Clone {
                reference_audio, ..
            } => Some(reference_audio),
            Workflow::Create { .. } => None,
        }
    }

    /// Short workflow name for logs.
    pub fn workflow_name(&self) -> &'static str {
        match self.workflow {
            Workflow::Clone { .. } => "clone",
            Workflow::Create { .. } => "create",
        }
    }
}

/// A newly written audio artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub audio_path: PathBuf,
    pub file_name: String,
    pub produced_at: DateTime<Local>,
    pub sample_rate: u32,
    pub sample_count: usize,
}

impl SynthesisResult {
    /// Duration of the artifact in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_count as f64 / self.sample_rate as f64
    }
}
