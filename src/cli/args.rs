//! CLI argument definitions.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::backend::Gender;
use crate::config::Overrides;

/// Voice cloning and voice creation front end for a Spark-TTS model server.
#[derive(Parser, Debug)]
#[command(name = "spark-tts-rs")]
#[command(about = "Voice cloning and parametric voice creation with Spark-TTS")]
#[command(version)]
pub struct Args {
    /// Settings file (JSON). Defaults to the user config directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory generated audio is written to
    #[arg(long, global = true)]
    pub results_dir: Option<PathBuf>,

    /// Model server host address
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Model server port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Program used to play generated audio
    #[arg(long, global = true)]
    pub player: Option<String>,

    /// Level table (JSON, "1".."5" to factor) used when the server has none
    #[arg(long, global = true)]
    pub level_map: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Clone a voice from reference audio
    Clone(CloneArgs),

    /// Create a voice from gender, pitch and speed
    Create(CreateArgs),

    /// Interactive shell
    Shell,
}

#[derive(ClapArgs, Debug, Clone, PartialEq)]
pub struct CloneArgs {
    /// Text to synthesize
    #[arg(short, long)]
    pub text: String,

    /// Reference audio to clone
    #[arg(short, long)]
    pub reference: PathBuf,

    /// Transcript of the reference audio
    #[arg(long)]
    pub reference_text: Option<String>,

    /// Play the result when it is ready
    #[arg(long)]
    pub play: bool,
}

#[derive(ClapArgs, Debug, Clone, PartialEq)]
pub struct CreateArgs {
    /// Text to synthesize
    #[arg(short, long)]
    pub text: String,

    #[arg(short, long, value_enum, default_value = "male")]
    pub gender: Gender,

    /// Pitch level, 1 (lowest) to 5 (highest)
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub pitch: u8,

    /// Speed level, 1 (slowest) to 5 (fastest)
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub speed: u8,

    /// Play the result when it is ready
    #[arg(long)]
    pub play: bool,
}

impl Args {
    /// Settings overrides given on the command line.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            results_dir: self.results_dir.clone(),
            model_host: self.host.clone(),
            model_port: self.port,
            player_command: self.player.clone(),
            level_map: self.level_map.clone(),
        }
    }
}
