//! Boundary to the neural TTS model.
//!
//! The model is an opaque inference engine. This module defines the
//! contract the rest of the crate consumes, plus an HTTP implementation
//! that talks to a local Spark-TTS inference server.

mod client;
mod types;

pub use client::HttpModel;
pub use types::{Gender, InferenceParams, InferenceResponse, ModelError, ModelInfo};

use std::collections::BTreeMap;

/// Trait for the loaded TTS model.
///
/// Allows the gateway to be exercised against mock models in tests.
#[cfg_attr(test, mockall::automock)]
pub trait Model: Send + Sync {
    /// Run one blocking inference call.
    ///
    /// # Returns
    /// Raw mono samples, or `None` when the model produced no result.
    fn inference(&self, params: &InferenceParams) -> Result<Option<Vec<f32>>, ModelError>;

    /// Sample rate the model reports for its output, if it reports one.
    fn sampling_rate(&self) -> Option<u32>;

    /// Level-to-factor table shipped alongside the model, if any.
    fn level_map(&self) -> Option<BTreeMap<u8, f32>>;
}

/// Connect to the model server at the given address.
pub fn connect_model(host: &str, port: u16) -> Result<HttpModel, ModelError> {
    HttpModel::connect(host, port)
}
