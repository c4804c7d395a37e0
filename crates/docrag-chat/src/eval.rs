use std::fs;
use std::path::Path;

use docrag_core::error::{Error, Result};

/// One question per line; blank lines and `#` comments are ignored.
pub fn parse_questions(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn load_questions(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|e| Error::from_io_at(e, path))?;
    let questions = parse_questions(&text);
    if questions.is_empty() {
        return Err(Error::InvalidInput(format!("{} contains no questions", path.display())));
    }
    Ok(questions)
}
