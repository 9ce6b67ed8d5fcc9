//! HTTP client for the model server.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, warn};

use super::Model;
use super::types::{InferenceParams, InferenceResponse, ModelError, ModelInfo};
use crate::levels::parse_keys;

/// Model backed by a Spark-TTS inference server.
pub struct HttpModel {
    base_url: String,
    client: reqwest::blocking::Client,
    info: ModelInfo,
}

impl HttpModel {
    /// Connect to the model server and read its description.
    pub fn connect(host: &str, port: u16) -> Result<Self, ModelError> {
        let base_url = format!("http://{host}:{port}");
        let client = reqwest::blocking::Client::builder()
            // Inference on CPU can take minutes.
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| ModelError::ConnectionFailed(e.to_string()))?;

        let info = fetch_info(&client, &base_url)?;
        debug!(
            model = %info.model,
            device = %info.device,
            sampling_rate = ?info.sampling_rate,
            "Connected to model server"
        );

        Ok(Self {
            base_url,
            client,
            info,
        })
    }

    /// Get the base URL for this model server.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Description reported by the server at connect time.
    pub fn info(&self) -> &ModelInfo {
        &self.info
    }
}

fn fetch_info(client: &reqwest::blocking::Client, base_url: &str) -> Result<ModelInfo, ModelError> {
    let url = format!("{base_url}/info");

    let response = client
        .get(&url)
        .send()
        .map_err(|e| ModelError::ConnectionFailed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(ModelError::BackendError(format!(
            "Status: {}",
            response.status()
        )));
    }

    response
        .json()
        .map_err(|e| ModelError::InvalidResponse(e.to_string()))
}

impl Model for HttpModel {
    fn inference(&self, params: &InferenceParams) -> Result<Option<Vec<f32>>, ModelError> {
        let url = format!("{}/inference", self.base_url);
        debug!(url = %url, "Posting inference request");

        let response = self
            .client
            .post(&url)
            .json(params)
            .send()
            .map_err(|e| ModelError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().unwrap_or_default();
            return Err(ModelError::ContractMismatch(format!("{status}: {body}")));
        }

        if !status.is_success() {
            return Err(ModelError::BackendError(format!("Status: {status}")));
        }

        let body: InferenceResponse = response
            .json()
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        Ok(body.audio)
    }

    fn sampling_rate(&self) -> Option<u32> {
        self.info.sampling_rate
    }

    fn level_map(&self) -> Option<BTreeMap<u8, f32>> {
        let raw = self.info.levels_map_ui.clone()?;
        match parse_keys(raw) {
            Ok(table) => Some(table),
            Err(e) => {
                warn!(error = %e, "Model server supplied an unusable level map");
                None
            }
        }
    }
}
