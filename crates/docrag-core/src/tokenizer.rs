use once_cell::sync::Lazy;
use regex::Regex;

#[allow(clippy::unwrap_used)]
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").unwrap());

/// Lowercased runs of word characters (Unicode letters, digits, underscore).
pub fn tokenize(text: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}
