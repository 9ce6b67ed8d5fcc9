//! Discrete UI level to model factor mapping.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

/// Lowest selectable level.
pub const MIN_LEVEL: u8 = 1;

/// Highest selectable level.
pub const MAX_LEVEL: u8 = 5;

/// Factor used for the middle level and for any unknown level.
pub const NEUTRAL_FACTOR: f32 = 1.0;

const DEFAULT_TABLE: [(u8, f32); 5] = [(1, 0.8), (2, 0.9), (3, 1.0), (4, 1.1), (5, 1.2)];

/// Errors that can occur when loading a level table from disk.
#[derive(Error, Debug)]
pub enum LevelMapError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid level table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid level key: {0}")]
    InvalidKey(String),
}

/// Where the active table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSource {
    BuiltIn,
    External,
}

impl std::fmt::Display for LevelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelSource::BuiltIn => f.write_str("built-in"),
            LevelSource::External => f.write_str("external"),
        }
    }
}

/// Total mapping from levels 1..=5 to pitch/speed factors.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelMap {
    factors: BTreeMap<u8, f32>,
    source: LevelSource,
}

impl LevelMap {
    /// The built-in table: 0.8, 0.9, 1.0, 1.1, 1.2.
    pub fn builtin() -> Self {
        Self {
            factors: DEFAULT_TABLE.into_iter().collect(),
            source: LevelSource::BuiltIn,
        }
    }

    /// Reconcile an externally supplied table with the built-in one.
    ///
    /// External entries win. Levels the external table leaves out keep
    /// their built-in factor so every level in 1..=5 stays defined.
    pub fn reconcile(external: Option<BTreeMap<u8, f32>>) -> Self {
        let Some(external) = external.filter(|table| !table.is_empty()) else {
            warn!("No external level map supplied, using built-in level map");
            return Self::builtin();
        };

        let mut map = Self::builtin();
        for (level, factor) in external {
            if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) || !factor.is_finite() {
                warn!(level, factor, "Ignoring out-of-range level map entry");
                continue;
            }
            map.factors.insert(level, factor);
        }
        map.source = LevelSource::External;

        info!(factors = ?map.factors, "Using external level map");
        map
    }

    /// Read a JSON table of the form `{"1": 0.8, "2": 0.9, ...}`.
    pub fn read_table(path: &Path) -> Result<BTreeMap<u8, f32>, LevelMapError> {
        let json = std::fs::read_to_string(path)?;
        let raw: BTreeMap<String, f32> = serde_json::from_str(&json)?;
        parse_keys(raw)
    }

    /// Look up the factor for a level, falling back to the neutral factor.
    pub fn factor(&self, level: u8) -> f32 {
        self.factors.get(&level).copied().unwrap_or(NEUTRAL_FACTOR)
    }

    /// Where this table came from.
    pub fn source(&self) -> LevelSource {
        self.source
    }
}

impl Default for LevelMap {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Convert string-keyed JSON tables into level keys.
pub fn parse_keys(raw: BTreeMap<String, f32>) -> Result<BTreeMap<u8, f32>, LevelMapError> {
    raw.into_iter()
        .map(|(key, factor)| {
            key.trim()
                .parse::<u8>()
                .map(|level| (level, factor))
                .map_err(|_| LevelMapError::InvalidKey(key))
        })
        .collect()
}
