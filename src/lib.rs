//! spark-tts-rs: voice cloning and voice creation on top of Spark-TTS.
//!
//! The crate runs synthesis jobs against an opaque TTS model on a
//! background thread, tracks session state for the clone and create
//! workflows, and plays back the generated audio.

pub mod app;
pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod job;
pub mod levels;
pub mod playback;
pub mod session;
pub mod text;
