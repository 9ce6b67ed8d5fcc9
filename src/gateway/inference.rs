//! Inference gateway implementation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use super::Synthesizer;
use super::types::{GatewayError, SynthesisRequest, SynthesisResult, Workflow};
use crate::backend::{InferenceParams, Model};
use crate::levels::LevelMap;
use crate::text;

/// Sample rate used when the model does not report one.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Timestamp format of artifact names; sorts lexically by time.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Wraps a loaded model and persists its output to the results directory.
pub struct InferenceGateway<M: Model> {
    model: M,
    results_dir: PathBuf,
}

impl<M: Model> InferenceGateway<M> {
    /// Create a gateway writing artifacts under `results_dir`.
    pub fn new(model: M, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            model,
            results_dir: results_dir.into(),
        }
    }

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Level table reconciled from the model's own table, a local file
    /// table, and the built-in default, in that order of preference.
    ///
    /// The local file is read only when the model supplies no table. An
    /// unreadable file is logged and skipped.
    pub fn level_map(&self, local_table: Option<&Path>) -> LevelMap {
        let table = self.model.level_map().or_else(|| {
            let path = local_table?;
            match LevelMap::read_table(path) {
                Ok(table) => {
                    debug!(path = %path.display(), "Read local level map");
                    Some(table)
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring unreadable level map file");
                    None
                }
            }
        });
        LevelMap::reconcile(table)
    }

    /// Sample rate for written audio.
    ///
    /// Prefers the rate the model reports and falls back to 16 kHz.
    pub fn sample_rate(&self) -> u32 {
        match self.model.sampling_rate() {
            Some(rate) if rate > 0 => rate,
            reported => {
                warn!(
                    reported = ?reported,
                    fallback = DEFAULT_SAMPLE_RATE,
                    "Model did not report a usable sample rate, using fallback"
                );
                DEFAULT_SAMPLE_RATE
            }
        }
    }

    /// Choose a fresh artifact path for `text` produced at `at`.
    pub(crate) fn artifact_path(&self, text: &str, at: &DateTime<Local>) -> PathBuf {
        let stem = artifact_stem(text, at);
        let mut path = self.results_dir.join(format!("{stem}.wav"));
        let mut suffix = 2;

        while path.exists() {
            path = self.results_dir.join(format!("{stem}_{suffix}.wav"));
            suffix += 1;
        }

        path
    }
}

impl<M: Model> Synthesizer for InferenceGateway<M> {
    fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisResult, GatewayError> {
        if let Some(reference) = request.reference_audio()
            && !reference.exists()
        {
            return Err(GatewayError::ReferenceNotFound(reference.to_path_buf()));
        }

        std::fs::create_dir_all(&self.results_dir)?;

        let params = inference_params(request);
        info!(
            workflow = request.workflow_name(),
            text = %preview(&params.text),
            results_dir = %self.results_dir.display(),
            "Starting inference"
        );

        let samples = self
            .model
            .inference(&params)?
            .filter(|samples| !samples.is_empty())
            .ok_or_else(|| GatewayError::InferenceFailure("Model returned no audio".to_string()))?;

        let sample_rate = self.sample_rate();
        let produced_at = Local::now();
        let audio_path = self.artifact_path(&request.text, &produced_at);

        write_or_discard(&audio_path, |path| write_wav(path, &samples, sample_rate))?;
        info!(
            path = %audio_path.display(),
            sample_rate,
            samples = samples.len(),
            "Audio saved"
        );

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(SynthesisResult {
            audio_path,
            file_name,
            produced_at,
            sample_rate,
            sample_count: samples.len(),
        })
    }
}

/// Artifact file stem: `{timestamp}_{prefix}`.
pub fn artifact_stem(text: &str, at: &DateTime<Local>) -> String {
    format!("{}_{}", at.format(TIMESTAMP_FORMAT), text::file_prefix(text))
}

/// Translate a request into the model's keyword set.
pub fn inference_params(request: &SynthesisRequest) -> InferenceParams {
    let mut params = InferenceParams::new(request.text.clone());

    match &request.workflow {
        Workflow::Clone {
            reference_audio,
            reference_text,
        } => {
            params.prompt_speech_path = Some(reference_audio.clone());
            params.prompt_text = reference_text.clone();
        }
        Workflow::Create {
            gender,
            pitch,
            speed,
        } => {
            params.gender = Some(*gender);
            params.pitch = Some(*pitch);
            params.speed = Some(*speed);
        }
    }

    debug!(params = ?params, "Resolved inference parameters");
    params
}

/// Run `write` against `path`, removing whatever it left behind on failure.
pub(crate) fn write_or_discard<F>(path: &Path, write: F) -> Result<(), GatewayError>
where
    F: FnOnce(&Path) -> Result<(), GatewayError>,
{
    let result = write(path);
    if let Err(err) = &result
        && path.exists()
    {
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), error = %err, "Removed partial artifact"),
            Err(e) => warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove partial artifact"
            ),
        }
    }
    result
}

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), GatewayError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    Ok(())
}

fn preview(text: &str) -> String {
    let head: String = text.chars().take(50).collect();
    if head.len() < text.len() {
        format!("{head}...")
    } else {
        head
    }
}
