//! spark-tts-rs CLI entry point.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossbeam_channel::unbounded;
use spark_tts_rs::app::{self, App};
use spark_tts_rs::backend;
use spark_tts_rs::cli::{Args, Command};
use spark_tts_rs::config::Settings;
use spark_tts_rs::gateway::InferenceGateway;
use spark_tts_rs::playback::{CommandPlayer, PlaybackController, PlaybackState};
use spark_tts_rs::session::{SessionController, SessionNotice};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let settings = Settings::load(args.config.as_deref(), args.overrides())
        .context("Failed to load settings")?;

    let model = backend::connect_model(&settings.model_host, settings.model_port)
        .with_context(|| {
            format!(
                "Failed to reach the model server at {}:{}",
                settings.model_host, settings.model_port
            )
        })?;
    let gateway = InferenceGateway::new(model, &settings.results_dir);
    let levels = gateway.level_map(settings.level_map.as_deref());

    let model = gateway.model();
    info!(
        url = model.base_url(),
        model = %model.info().model,
        device = %model.info().device,
        levels = %levels.source(),
        "Model ready"
    );

    let mut session = SessionController::new(Arc::new(gateway), levels, &settings.results_dir);

    let (player_tx, player_rx) = unbounded();
    let player = CommandPlayer::new(settings.player_program(), player_tx);
    debug!(player = player.program(), "Using external player");
    let mut playback = PlaybackController::new(player);

    let play = match args.command {
        Command::Clone(clone) => {
            session
                .submit_clone(&clone.text, &clone.reference, clone.reference_text.as_deref())
                .context("Failed to start voice cloning")?;
            clone.play
        }
        Command::Create(create) => {
            session
                .submit_create(&create.text, create.gender, create.pitch, create.speed)
                .context("Failed to start voice creation")?;
            create.play
        }
        Command::Shell => {
            let lines = app::spawn_line_reader(io::BufReader::new(io::stdin()))
                .context("Failed to start input reader")?;
            let mut app = App::new(session, playback, io::stdout()).with_opener(folder_opener());

            println!("spark-tts-rs shell. Type 'help' for commands.");
            app::run_shell(&mut app, &lines, &player_rx).context("Shell terminated")?;
            return Ok(());
        }
    };

    let mut stdout = io::stdout();
    match app::wait_for_outcome(&mut session, &mut stdout)? {
        SessionNotice::Failed { kind, message } => bail!("Synthesis failed ({kind}): {message}"),
        SessionNotice::Cancelled => bail!("Synthesis cancelled"),
        SessionNotice::Ready(_) | SessionNotice::Progress { .. } => {}
    }

    if play {
        let state = app::play_to_end(&mut playback, session.last_result(), &player_rx)
            .context("Failed to play generated audio")?;
        if let PlaybackState::Error(message) = state {
            warn!(message = %message, "Playback did not finish");
        }
        playback.shutdown();
    }

    stdout.flush()?;
    info!("Done");
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .compact()
        .try_init()
        .ok();
}

fn folder_opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    }
}
