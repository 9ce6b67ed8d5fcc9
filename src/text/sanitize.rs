//! Text normalization applied to every free-text field.

/// Number of leading characters considered when deriving a file name prefix.
const PREFIX_CHARS: usize = 15;

/// Fallback file name prefix when the text contains no usable characters.
const FALLBACK_PREFIX: &str = "audio";

/// Normalize free-form text before it reaches the model.
///
/// Newlines and tabs become spaces, whitespace runs collapse to a single
/// space, and the result is trimmed.
pub fn clean(text: &str) -> String {
    text.replace(['\n', '\t'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Like [`clean`], but treats `None` as empty input.
pub fn clean_opt(text: Option<&str>) -> String {
    text.map(clean).unwrap_or_default()
}

/// Derive the artifact file name prefix from the synthesized text.
///
/// Keeps alphanumerics, spaces and underscores from the first 15
/// characters, drops trailing spaces, and falls back to `"audio"`.
pub fn file_prefix(text: &str) -> String {
    let prefix: String = text
        .chars()
        .take(PREFIX_CHARS)
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect();
    let prefix = prefix.trim_end();

    if prefix.is_empty() {
        FALLBACK_PREFIX.to_string()
    } else {
        prefix.to_string()
    }
}
