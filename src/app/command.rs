//! Interactive shell command parsing.

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::Gender;
use crate::levels::{MAX_LEVEL, MIN_LEVEL};

/// Separator between the fields of `clone` and `create`.
const FIELD_SEPARATOR: char = '|';

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Clone {
        reference: PathBuf,
        text: String,
        reference_text: Option<String>,
    },
    Create {
        gender: Gender,
        pitch: u8,
        speed: u8,
        text: String,
    },
    Cancel,
    Play,
    Stop,
    Status,
    Open,
    Help,
    Quit,
    Empty,
}

/// Errors that can occur when parsing a shell line.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type 'help' for a list of commands")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid gender: {0}")]
    InvalidGender(String),

    #[error("Invalid level '{0}': expected {min} to {max}", min = MIN_LEVEL, max = MAX_LEVEL)]
    InvalidLevel(String),
}

const CLONE_USAGE: &str = "clone <reference audio> | <text> [| <reference transcript>]";
const CREATE_USAGE: &str = "create <male|female> <pitch 1-5> <speed 1-5> | <text>";

pub const HELP: &str = "\
Commands:
  clone <reference audio> | <text> [| <reference transcript>]
  create <male|female> <pitch 1-5> <speed 1-5> | <text>
  cancel    cancel the running synthesis
  play      play the last generated audio
  stop      stop playback
  status    show session and playback state
  open      show the output folder
  help      show this help
  quit      exit";

impl ShellCommand {
    /// Parse one line of shell input.
    ///
    /// Field values may be empty; text validation happens on submission.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Ok(ShellCommand::Empty),
            "clone" => parse_clone(rest),
            "create" => parse_create(rest),
            "cancel" => Ok(ShellCommand::Cancel),
            "play" => Ok(ShellCommand::Play),
            "stop" => Ok(ShellCommand::Stop),
            "status" => Ok(ShellCommand::Status),
            "open" => Ok(ShellCommand::Open),
            "help" | "?" => Ok(ShellCommand::Help),
            "quit" | "exit" => Ok(ShellCommand::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_clone(rest: &str) -> Result<ShellCommand, CommandError> {
    // Anything after the second separator belongs to the transcript.
    let mut fields = rest.splitn(3, FIELD_SEPARATOR).map(str::trim);

    let reference = fields.next().unwrap_or_default();
    let Some(text) = fields.next() else {
        return Err(CommandError::Usage(CLONE_USAGE));
    };
    let reference_text = fields.next().map(str::to_string);

    Ok(ShellCommand::Clone {
        reference: PathBuf::from(reference),
        text: text.to_string(),
        reference_text,
    })
}

fn parse_create(rest: &str) -> Result<ShellCommand, CommandError> {
    let Some((params, text)) = rest.split_once(FIELD_SEPARATOR) else {
        return Err(CommandError::Usage(CREATE_USAGE));
    };

    let params: Vec<&str> = params.split_whitespace().collect();
    let [gender, pitch, speed] = params.as_slice() else {
        return Err(CommandError::Usage(CREATE_USAGE));
    };

    Ok(ShellCommand::Create {
        gender: gender.parse().map_err(CommandError::InvalidGender)?,
        pitch: parse_level(pitch)?,
        speed: parse_level(speed)?,
        text: text.trim().to_string(),
    })
}

fn parse_level(raw: &str) -> Result<u8, CommandError> {
    raw.parse::<u8>()
        .ok()
        .filter(|level| (MIN_LEVEL..=MAX_LEVEL).contains(level))
        .ok_or_else(|| CommandError::InvalidLevel(raw.to_string()))
}
