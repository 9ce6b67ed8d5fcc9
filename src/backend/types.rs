//! Model boundary request/response types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when talking to the model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The model rejected the parameter names or shapes of the call.
    #[error("Model contract mismatch: {0}")]
    ContractMismatch(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Target voice gender for parametric creation.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Returns the parameter string the model expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            other => Err(format!("unknown gender '{other}'")),
        }
    }
}

/// Keyword arguments of a single model inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceParams {
    pub text: String,
    pub prompt_speech_path: Option<PathBuf>,
    pub prompt_text: Option<String>,
    pub gender: Option<Gender>,
    pub pitch: Option<f32>,
    pub speed: Option<f32>,
}

impl InferenceParams {
    /// Create parameters for plain text with no voice controls.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            prompt_speech_path: None,
            prompt_text: None,
            gender: None,
            pitch: None,
            speed: None,
        }
    }
}

/// Model server description returned by `/info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model: String,
    pub device: String,
    #[serde(default)]
    pub sampling_rate: Option<u32>,
    #[serde(default)]
    pub levels_map_ui: Option<BTreeMap<String, f32>>,
}

/// Response body of `/inference`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResponse {
    #[serde(default)]
    pub audio: Option<Vec<f32>>,
}
