//! Text sanitization for synthesis input.

mod sanitize;

pub use sanitize::{clean, clean_opt, file_prefix};
