//! Inference gateway.
//!
//! The single blocking entry point between job execution and the model:
//! validates the reference clip, runs inference, resolves the sample rate,
//! and writes the artifact to the results directory.

mod inference;
mod types;

pub use inference::{DEFAULT_SAMPLE_RATE, InferenceGateway, artifact_stem, inference_params};
pub use types::{
    GatewayError, MIN_REFERENCE_TEXT_CHARS, SynthesisRequest, SynthesisResult, Workflow,
};

/// Trait for anything that can turn a request into an audio artifact.
///
/// Job execution depends on this rather than on a concrete gateway.
#[cfg_attr(test, mockall::automock)]
pub trait Synthesizer: Send + Sync {
    /// Run one synthesis; blocks for the duration of inference.
    fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisResult, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Gender, MockModel, ModelError};
    use crate::error::ErrorKind;
    use crate::levels::{LevelMap, LevelSource};
    use chrono::{Local, TimeZone};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn gateway_with(mock: MockModel, temp_dir: &TempDir) -> InferenceGateway<MockModel> {
        InferenceGateway::new(mock, temp_dir.path().join("tts_results"))
    }

    // ===========================================
    // Validation tests
    // ===========================================

    #[test]
    fn test_reference_not_found_skips_model() {
        let temp_dir = TempDir::new().unwrap();
        let mut mock = MockModel::new();
        mock.expect_inference().times(0);

        let gateway = gateway_with(mock, &temp_dir);
        let request = SynthesisRequest::clone_voice("Hello", "/nonexistent/ref.wav", None);

        let result = gateway.synthesize(&request);
        assert!(matches!(result, Err(GatewayError::ReferenceNotFound(_))));
        assert_eq!(result.unwrap_err().kind(), ErrorKind::ReferenceNotFound);
    }

    #[test]
    fn test_model_no_result_is_inference_failure() {
        let temp_dir = TempDir::new().unwrap();
        let mut mock = MockModel::new();
        mock.expect_inference().times(1).returning(|_| Ok(None));

        let gateway = gateway_with(mock, &temp_dir);
        let request = SynthesisRequest::create_voice("Hello", Gender::Male, 1.0, 1.0);

        let err = gateway.synthesize(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InferenceFailure);
    }

    #[test]
    fn test_empty_audio_is_inference_failure() {
        let temp_dir = TempDir::new().unwrap();
        let mut mock = MockModel::new();
        mock.expect_inference().times(1).returning(|_| Ok(Some(Vec::new())));

        let gateway = gateway_with(mock, &temp_dir);
        let request = SynthesisRequest::create_voice("Hello", Gender::Male, 1.0, 1.0);

        assert!(matches!(
            gateway.synthesize(&request),
            Err(GatewayError::InferenceFailure(_))
        ));
    }

    #[test]
    fn test_contract_mismatch_is_distinct() {
        let temp_dir = TempDir::new().unwrap();
        let mut mock = MockModel::new();
        mock.expect_inference()
            .times(1)
            .returning(|_| Err(ModelError::ContractMismatch("unexpected keyword 'gender'".into())));

        let gateway = gateway_with(mock, &temp_dir);
        let request = SynthesisRequest::create_voice("Hello", Gender::Female, 1.0, 1.0);

        let err = gateway.synthesize(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelContractMismatch);
        assert!(err.to_string().contains("gender"));
    }

    #[test]
    fn test_other_model_errors_are_unexpected() {
        let temp_dir = TempDir::new().unwrap();
        let mut mock = MockModel::new();
        mock.expect_inference()
            .times(1)
            .returning(|_| Err(ModelError::ConnectionFailed("refused".into())));

        let gateway = gateway_with(mock, &temp_dir);
        let request = SynthesisRequest::create_voice("Hello", Gender::Female, 1.0, 1.0);

        assert_eq!(
            gateway.synthesize(&request).unwrap_err().kind(),
            ErrorKind::UnexpectedError
        );
    }

    // ===========================================
    // Parameter mapping tests
    // ===========================================

    #[test]
    fn test_create_passes_factors_to_model() {
        let temp_dir = TempDir::new().unwrap();
        let mut mock = MockModel::new();
        mock.expect_inference()
            .withf(|p| {
                p.gender == Some(Gender::Female)
                    && p.pitch == Some(1.2)
                    && p.speed == Some(0.8)
                    && p.prompt_speech_path.is_none()
                    && p.prompt_text.is_none()
            })
            .times(1)
            .returning(|_| Ok(Some(vec![0.1; 160])));
        mock.expect_sampling_rate().returning(|| Some(16_000));

        let gateway = gateway_with(mock, &temp_dir);
        let request = SynthesisRequest::create_voice("Hello", Gender::Female, 1.2, 0.8);

        assert!(gateway.synthesize(&request).is_ok());
    }

    #[test]
    fn test_clone_passes_reference_and_drops_short_text() {
        let temp_dir = TempDir::new().unwrap();
        let reference = temp_dir.path().join("ref.wav");
        std::fs::write(&reference, b"RIFF").unwrap();

        let expected = reference.clone();
        let mut mock = MockModel::new();
        mock.expect_inference()
            .withf(move |p| {
                p.prompt_speech_path.as_deref() == Some(expected.as_path())
                    && p.prompt_text.is_none()
                    && p.gender.is_none()
                    && p.pitch.is_none()
            })
            .times(1)
            .returning(|_| Ok(Some(vec![0.1; 160])));
        mock.expect_sampling_rate().returning(|| Some(16_000));

        let gateway = gateway_with(mock, &temp_dir);
        let request = SynthesisRequest::clone_voice("Hello", &reference, Some("a".to_string()));

        assert!(gateway.synthesize(&request).is_ok());
    }

    // ===========================================
    // Artifact tests
    // ===========================================

    #[test]
    fn test_writes_wav_with_reported_rate() {
        let temp_dir = TempDir::new().unwrap();
        let mut mock = MockModel::new();
        mock.expect_inference()
            .times(1)
            .returning(|_| Ok(Some(vec![0.25; 2400])));
        mock.expect_sampling_rate().returning(|| Some(24_000));

        let gateway = gateway_with(mock, &temp_dir);
        let request = SynthesisRequest::create_voice("Hello world", Gender::Male, 1.0, 1.0);

        let result = gateway.synthesize(&request).unwrap();
        assert!(result.audio_path.exists());
        assert!(result.file_name.ends_with("_Hello world.wav"));
        assert_eq!(result.sample_rate, 24_000);
        assert_eq!(result.sample_count, 2400);
        assert!((result.duration_secs() - 0.1).abs() < 1e-9);

        let reader = hound::WavReader::open(&result.audio_path).unwrap();
        assert_eq!(reader.spec().sample_rate, 24_000);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.len(), 2400);
    }

    #[test]
    fn test_sample_rate_falls_back_to_default() {
        let temp_dir = TempDir::new().unwrap();
        let mut mock = MockModel::new();
        mock.expect_inference()
            .times(1)
            .returning(|_| Ok(Some(vec![0.0; 16])));
        mock.expect_sampling_rate().returning(|| None);

        let gateway = gateway_with(mock, &temp_dir);
        let request = SynthesisRequest::create_voice("Hi", Gender::Male, 1.0, 1.0);

        let result = gateway.synthesize(&request).unwrap();
        assert_eq!(result.sample_rate, DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn test_results_dir_created_on_demand() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        let mut mock = MockModel::new();
        mock.expect_inference()
            .times(1)
            .returning(|_| Ok(Some(vec![0.0; 16])));
        mock.expect_sampling_rate().returning(|| Some(16_000));

        let gateway = InferenceGateway::new(mock, &nested);
        let request = SynthesisRequest::create_voice("Hi", Gender::Male, 1.0, 1.0);

        let result = gateway.synthesize(&request).unwrap();
        assert!(nested.is_dir());
        assert_eq!(result.audio_path.parent(), Some(nested.as_path()));
    }

    #[test]
    fn test_artifact_stem_format() {
        let at = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(artifact_stem("Hello world", &at), "20240102_030405_Hello world");
        assert_eq!(artifact_stem("!!!", &at), "20240102_030405_audio");
    }

    #[test]
    fn test_artifact_path_avoids_collisions() {
        let temp_dir = TempDir::new().unwrap();
        let gateway = InferenceGateway::new(MockModel::new(), temp_dir.path());
        let at = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let first = gateway.artifact_path("Hello", &at);
        std::fs::write(&first, b"taken").unwrap();
        let second = gateway.artifact_path("Hello", &at);

        assert_ne!(first, second);
        assert!(second.ends_with("20240102_030405_Hello_2.wav"));
    }

    #[test]
    fn test_failed_write_removes_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("partial.wav");

        let result = inference::write_or_discard(&path, |path| {
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: 16_000,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            };
            let mut writer = hound::WavWriter::create(path, spec)?;
            writer.write_sample(0.25f32)?;
            writer.flush()?;
            Err(GatewayError::IoError(std::io::Error::other("No space left on device")))
        });

        assert!(matches!(result, Err(GatewayError::IoError(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_successful_write_keeps_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("complete.wav");

        inference::write_or_discard(&path, |path| {
            std::fs::write(path, b"RIFF")?;
            Ok(())
        })
        .unwrap();

        assert!(path.exists());
    }

    // ===========================================
    // Level map tests
    // ===========================================

    fn level_file(temp_dir: &TempDir, json: &str) -> std::path::PathBuf {
        let path = temp_dir.path().join("levels.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_model_level_map_wins_over_local() {
        let mut mock = MockModel::new();
        mock.expect_level_map()
            .returning(|| Some(BTreeMap::from([(5, 1.4)])));

        let temp_dir = TempDir::new().unwrap();
        let path = level_file(&temp_dir, r#"{"5": 1.3}"#);
        let gateway = gateway_with(mock, &temp_dir);
        let map = gateway.level_map(Some(&path));

        assert_eq!(map.factor(5), 1.4);
    }

    #[test]
    fn test_model_level_map_ignores_missing_local_file() {
        let mut mock = MockModel::new();
        mock.expect_level_map()
            .returning(|| Some(BTreeMap::from([(1, 0.5)])));

        let temp_dir = TempDir::new().unwrap();
        let gateway = gateway_with(mock, &temp_dir);
        let map = gateway.level_map(Some(&temp_dir.path().join("missing.json")));

        assert_eq!(map.factor(1), 0.5);
        assert_eq!(map.source(), LevelSource::External);
    }

    #[test]
    fn test_local_level_map_used_when_model_has_none() {
        let mut mock = MockModel::new();
        mock.expect_level_map().returning(|| None);

        let temp_dir = TempDir::new().unwrap();
        let path = level_file(&temp_dir, r#"{"5": 1.3}"#);
        let gateway = gateway_with(mock, &temp_dir);
        let map = gateway.level_map(Some(&path));

        assert_eq!(map.factor(5), 1.3);
        assert_eq!(map.factor(1), 0.8);
    }

    #[test]
    fn test_unreadable_local_level_map_falls_back_to_builtin() {
        let mut mock = MockModel::new();
        mock.expect_level_map().returning(|| None);

        let temp_dir = TempDir::new().unwrap();
        let path = level_file(&temp_dir, "not json");
        let gateway = gateway_with(mock, &temp_dir);

        assert_eq!(gateway.level_map(Some(&path)), LevelMap::builtin());
        assert_eq!(
            gateway.level_map(Some(&temp_dir.path().join("missing.json"))),
            LevelMap::builtin()
        );
    }
}
