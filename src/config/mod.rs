//! Settings file handling and command-line overrides.

mod settings;

pub use settings::{ConfigError, DEFAULT_MODEL_PORT, DEFAULT_RESULTS_DIR, Overrides, Settings};
