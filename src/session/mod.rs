//! Session orchestration.
//!
//! Validates submissions from the clone and create workflows, admits one
//! job at a time, reduces job events into a client-visible status, and
//! keeps the handle of the last successful artifact.

mod controller;
mod types;

pub use controller::SessionController;
pub use types::{LastResult, SessionNotice, SessionStatus, SubmitError};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Gender;
    use crate::error::ErrorKind;
    use crate::gateway::{GatewayError, MockSynthesizer, SynthesisResult, Workflow};
    use crate::job::{JobEvent, JobEventKind, JobId};
    use crate::levels::LevelMap;
    use chrono::Local;
    use crossbeam_channel::bounded;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn session_with(mock: MockSynthesizer, dir: &TempDir) -> SessionController<MockSynthesizer> {
        SessionController::new(Arc::new(mock), LevelMap::builtin(), dir.path().join("tts_results"))
    }

    fn result_at(path: &Path) -> SynthesisResult {
        SynthesisResult {
            audio_path: path.to_path_buf(),
            file_name: path.file_name().unwrap().to_string_lossy().into_owned(),
            produced_at: Local::now(),
            sample_rate: 16_000,
            sample_count: 16,
        }
    }

    fn reference_file(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("reference.wav");
        std::fs::write(&path, b"RIFF").unwrap();
        path
    }

    /// Apply events until the current job reaches its outcome.
    fn wait_terminal(session: &mut SessionController<MockSynthesizer>) -> SessionNotice {
        loop {
            let event = session.job_events().recv_timeout(TIMEOUT).expect("job event");
            match session.apply(event) {
                Some(SessionNotice::Progress { .. }) | None => continue,
                Some(notice) => return notice,
            }
        }
    }

    // ===========================================
    // Validation tests
    // ===========================================

    #[test]
    fn test_empty_text_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut mock = MockSynthesizer::new();
        mock.expect_synthesize().times(0);
        let mut session = session_with(mock, &temp_dir);

        let result = session.submit_create(" \n\t ", Gender::Male, 3, 3);
        assert!(matches!(result, Err(SubmitError::EmptyInput)));
        assert_eq!(session.status(), &SessionStatus::Idle);
        assert!(!session.is_busy());
    }

    #[test]
    fn test_clone_without_reference_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session_with(MockSynthesizer::new(), &temp_dir);

        let err = session.submit_clone("Hello", Path::new(""), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingReference);
    }

    #[test]
    fn test_clone_with_missing_reference_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut mock = MockSynthesizer::new();
        mock.expect_synthesize().times(0);
        let mut session = session_with(mock, &temp_dir);

        let err = session
            .submit_clone("Hello", Path::new("/nonexistent/ref.wav"), None)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ReferenceNotFound);
        assert_eq!(session.status(), &SessionStatus::Idle);
        assert!(session.current_job().is_none());
        assert!(session.job_events().try_recv().is_err());
    }

    #[test]
    fn test_empty_text_checked_before_reference() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session_with(MockSynthesizer::new(), &temp_dir);

        let err = session.submit_clone("", Path::new(""), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyInput);
    }

    // ===========================================
    // Clone workflow tests
    // ===========================================

    #[test]
    fn test_clone_success_sets_last_result() {
        let temp_dir = TempDir::new().unwrap();
        let reference = reference_file(&temp_dir);
        let artifact = temp_dir.path().join("20240101_000000_Hello world.wav");
        std::fs::write(&artifact, b"RIFF").unwrap();

        let expected_ref = reference.clone();
        let returned = artifact.clone();
        let mut mock = MockSynthesizer::new();
        mock.expect_synthesize()
            .withf(move |req| {
                req.text == "Hello world"
                    && req.workflow
                        == Workflow::Clone {
                            reference_audio: expected_ref.clone(),
                            reference_text: None,
                        }
            })
            .times(1)
            .returning(move |_| Ok(result_at(&returned)));

        let mut session = session_with(mock, &temp_dir);
        let id = session
            .submit_clone("  Hello\tworld ", &reference, None)
            .unwrap();

        assert_eq!(session.status(), &SessionStatus::Busy(id));
        assert_eq!(session.current_job().unwrap().request().text, "Hello world");

        let notice = wait_terminal(&mut session);
        assert!(matches!(notice, SessionNotice::Ready(_)));
        assert_eq!(session.status(), &SessionStatus::Ready);
        assert!(!session.is_busy());

        let last = session.last_result().unwrap();
        assert_eq!(last.audio_path, artifact);
        assert_eq!(last.file_name, "20240101_000000_Hello world.wav");
    }

    #[test]
    fn test_clone_reference_text_is_cleaned() {
        let temp_dir = TempDir::new().unwrap();
        let reference = reference_file(&temp_dir);
        let artifact = temp_dir.path().join("out.wav");

        let returned = artifact.clone();
        let mut mock = MockSynthesizer::new();
        mock.expect_synthesize()
            .withf(|req| {
                matches!(
                    &req.workflow,
                    Workflow::Clone { reference_text: Some(t), .. } if t == "the quick fox"
                )
            })
            .times(1)
            .returning(move |_| Ok(result_at(&returned)));

        let mut session = session_with(mock, &temp_dir);
        session
            .submit_clone("Hello", &reference, Some("\tthe  quick\nfox "))
            .unwrap();

        assert!(matches!(wait_terminal(&mut session), SessionNotice::Ready(_)));
    }

    #[test]
    fn test_clone_short_reference_text_treated_as_absent() {
        let temp_dir = TempDir::new().unwrap();
        let reference = reference_file(&temp_dir);
        let artifact = temp_dir.path().join("out.wav");

        let returned = artifact.clone();
        let mut mock = MockSynthesizer::new();
        mock.expect_synthesize()
            .withf(|req| {
                matches!(
                    &req.workflow,
                    Workflow::Clone {
                        reference_text: None,
                        ..
                    }
                )
            })
            .times(1)
            .returning(move |_| Ok(result_at(&returned)));

        let mut session = session_with(mock, &temp_dir);
        session.submit_clone("Hello", &reference, Some(" a \n")).unwrap();

        assert!(matches!(wait_terminal(&mut session), SessionNotice::Ready(_)));
    }

    // ===========================================
    // Create workflow tests
    // ===========================================

    #[test]
    fn test_create_resolves_levels_to_factors() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = temp_dir.path().join("out.wav");

        let returned = artifact.clone();
        let mut mock = MockSynthesizer::new();
        mock.expect_synthesize()
            .withf(|req| {
                req.workflow
                    == Workflow::Create {
                        gender: Gender::Female,
                        pitch: 1.2,
                        speed: 0.8,
                    }
            })
            .times(1)
            .returning(move |_| Ok(result_at(&returned)));

        let mut session = session_with(mock, &temp_dir);
        session.submit_create("Hello", Gender::Female, 5, 1).unwrap();

        assert!(matches!(wait_terminal(&mut session), SessionNotice::Ready(_)));
    }

    #[test]
    fn test_create_unknown_level_is_neutral() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = temp_dir.path().join("out.wav");

        let returned = artifact.clone();
        let mut mock = MockSynthesizer::new();
        mock.expect_synthesize()
            .withf(|req| {
                matches!(
                    req.workflow,
                    Workflow::Create { pitch, speed, .. } if pitch == 1.0 && speed == 1.0
                )
            })
            .times(1)
            .returning(move |_| Ok(result_at(&returned)));

        let mut session = session_with(mock, &temp_dir);
        session.submit_create("Hello", Gender::Male, 0, 9).unwrap();

        assert!(matches!(wait_terminal(&mut session), SessionNotice::Ready(_)));
    }

    // ===========================================
    // Admission control tests
    // ===========================================

    #[test]
    fn test_second_submission_while_running_is_busy() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = temp_dir.path().join("first.wav");
        let (gate_tx, gate_rx) = bounded::<()>(0);

        let returned = artifact.clone();
        let mut mock = MockSynthesizer::new();
        mock.expect_synthesize().times(1).returning(move |_| {
            gate_rx.recv().unwrap();
            Ok(result_at(&returned))
        });

        let mut session = session_with(mock, &temp_dir);
        let first = session.submit_create("First", Gender::Male, 3, 3).unwrap();

        let second = session.submit_create("Second", Gender::Female, 3, 3);
        assert!(matches!(second, Err(SubmitError::Busy)));
        assert_eq!(second.unwrap_err().kind(), ErrorKind::Busy);
        assert_eq!(session.status(), &SessionStatus::Busy(first));

        gate_tx.send(()).unwrap();
        match wait_terminal(&mut session) {
            SessionNotice::Ready(last) => assert_eq!(last.audio_path, artifact),
            other => panic!("unexpected notice: {other:?}"),
        }
        assert_eq!(session.status(), &SessionStatus::Ready);
    }

    #[test]
    fn test_queued_terminal_event_does_not_block_admission() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = temp_dir.path().join("out.wav");

        let returned = artifact.clone();
        let mut mock = MockSynthesizer::new();
        mock.expect_synthesize()
            .times(2)
            .returning(move |_| Ok(result_at(&returned)));

        let mut session = session_with(mock, &temp_dir);
        session.submit_create("First", Gender::Male, 3, 3).unwrap();

        // Let the first job finish without applying its events.
        let mut handle_done = false;
        for _ in 0..500 {
            if session.current_job().unwrap().is_finished() {
                handle_done = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(handle_done);

        let second = session.submit_create("Second", Gender::Male, 3, 3);
        assert!(second.is_ok());

        // The first job's outcome is still reported, followed by the second's.
        let mut notices = session.pump();
        let ready = |notices: &[SessionNotice]| {
            notices
                .iter()
                .filter(|n| matches!(n, SessionNotice::Ready(_)))
                .count()
        };
        assert!(ready(&notices) >= 1);
        if ready(&notices) < 2 {
            notices.push(wait_terminal(&mut session));
        }
        assert_eq!(ready(&notices), 2);
    }

    // ===========================================
    // Failure and cancellation tests
    // ===========================================

    #[test]
    fn test_failure_keeps_previous_last_result() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = temp_dir.path().join("good.wav");

        let returned = artifact.clone();
        let mut calls = 0;
        let mut mock = MockSynthesizer::new();
        mock.expect_synthesize().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(result_at(&returned))
            } else {
                Err(GatewayError::InferenceFailure("Model returned no audio".into()))
            }
        });

        let mut session = session_with(mock, &temp_dir);
        session.submit_create("Good", Gender::Male, 3, 3).unwrap();
        wait_terminal(&mut session);

        session.submit_create("Bad", Gender::Male, 3, 3).unwrap();
        match wait_terminal(&mut session) {
            SessionNotice::Failed { kind, message } => {
                assert_eq!(kind, ErrorKind::InferenceFailure);
                assert!(message.contains("Model returned no audio"));
            }
            other => panic!("unexpected notice: {other:?}"),
        }

        assert!(matches!(
            session.status(),
            SessionStatus::Error {
                kind: ErrorKind::InferenceFailure,
                ..
            }
        ));
        assert_eq!(session.last_result().unwrap().audio_path, artifact);
    }

    #[test]
    fn test_cancel_removes_artifact_and_returns_to_idle() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = temp_dir.path().join("cancelled.wav");
        let (gate_tx, gate_rx) = bounded::<()>(0);

        let produced = artifact.clone();
        let mut mock = MockSynthesizer::new();
        mock.expect_synthesize().times(1).returning(move |_| {
            gate_rx.recv().unwrap();
            std::fs::write(&produced, b"RIFF").unwrap();
            Ok(result_at(&produced))
        });

        let mut session = session_with(mock, &temp_dir);
        session.submit_create("Hello", Gender::Male, 3, 3).unwrap();

        // Wait for dispatch so the post-dispatch check sees the flag.
        loop {
            let event = session.job_events().recv_timeout(TIMEOUT).unwrap();
            let is_running =
                event.kind == JobEventKind::Progress(crate::job::PROGRESS_RUNNING.into());
            session.apply(event);
            if is_running {
                break;
            }
        }

        assert!(session.cancel());
        gate_tx.send(()).unwrap();

        assert_eq!(wait_terminal(&mut session), SessionNotice::Cancelled);
        assert_eq!(session.status(), &SessionStatus::Idle);
        assert!(session.last_result().is_none());
        assert!(!artifact.exists());
    }

    #[test]
    fn test_cancel_without_job_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let session = session_with(MockSynthesizer::new(), &temp_dir);
        assert!(!session.cancel());
    }

    #[test]
    fn test_events_from_other_jobs_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session_with(MockSynthesizer::new(), &temp_dir);

        let stray = JobEvent {
            job_id: JobId(42),
            kind: JobEventKind::Cancelled,
        };
        assert!(session.apply(stray).is_none());
        assert_eq!(session.status(), &SessionStatus::Idle);
    }

    // ===========================================
    // Output folder tests
    // ===========================================

    #[test]
    fn test_output_folder_none_without_results() {
        let temp_dir = TempDir::new().unwrap();
        let session = session_with(MockSynthesizer::new(), &temp_dir);
        assert!(session.output_folder().is_none());
    }

    #[test]
    fn test_output_folder_falls_back_to_results_dir() {
        let temp_dir = TempDir::new().unwrap();
        let session = session_with(MockSynthesizer::new(), &temp_dir);
        std::fs::create_dir_all(session.results_dir()).unwrap();

        let folder = session.output_folder().unwrap();
        assert!(folder.ends_with("tts_results"));
    }
}
