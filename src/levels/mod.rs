//! Pitch and speed level resolution.
//!
//! The interface exposes pitch and speed as levels 1 to 5; the model wants
//! multiplicative factors. The table can be supplied by the model server,
//! by a local file, or fall back to the built-in default.

mod map;

pub use map::{
    LevelMap, LevelMapError, LevelSource, MAX_LEVEL, MIN_LEVEL, NEUTRAL_FACTOR, parse_keys,
};
