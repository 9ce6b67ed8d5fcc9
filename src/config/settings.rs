//! Application settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Default directory for generated audio.
pub const DEFAULT_RESULTS_DIR: &str = "tts_results";

/// Default port of the local model server.
pub const DEFAULT_MODEL_PORT: u16 = 9290;

/// Errors that can occur when loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Persistent settings, read from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory generated audio is written to.
    pub results_dir: PathBuf,
    /// Model server host.
    pub model_host: String,
    /// Model server port.
    pub model_port: u16,
    /// External player program used for playback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_command: Option<String>,
    /// Optional level table used when the model does not supply one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_map: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            model_host: "localhost".to_string(),
            model_port: DEFAULT_MODEL_PORT,
            player_command: None,
            level_map: None,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub results_dir: Option<PathBuf>,
    pub model_host: Option<String>,
    pub model_port: Option<u16>,
    pub player_command: Option<String>,
    pub level_map: Option<PathBuf>,
}

impl Settings {
    /// Location of the default settings file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("spark-tts-rs").join("config.json"))
    }

    /// Read settings from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Resolve settings: defaults, then the file, then overrides.
    ///
    /// An explicit `path` must exist. Without one, the default file is used
    /// only when present.
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(default) => {
                    debug!(path = %default.display(), "Loading default settings file");
                    Self::from_file(&default)?
                }
                None => Self::default(),
            },
        };

        Ok(settings.with_overrides(overrides))
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(dir) = overrides.results_dir {
            self.results_dir = dir;
        }
        if let Some(host) = overrides.model_host {
            self.model_host = host;
        }
        if let Some(port) = overrides.model_port {
            self.model_port = port;
        }
        if overrides.player_command.is_some() {
            self.player_command = overrides.player_command;
        }
        if overrides.level_map.is_some() {
            self.level_map = overrides.level_map;
        }
        self
    }

    /// Player program, falling back to the platform default.
    pub fn player_program(&self) -> String {
        self.player_command
            .clone()
            .unwrap_or_else(|| default_player().to_string())
    }
}

fn default_player() -> &'static str {
    if cfg!(target_os = "macos") {
        "afplay"
    } else {
        "aplay"
    }
}
