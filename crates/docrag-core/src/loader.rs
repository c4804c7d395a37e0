//! Markdown/HTML/plain-text document loading and cleanup.
//!
//! Sources may be files or directories; directories are walked recursively in
//! sorted order. Each file is reduced to prose paragraphs separated by blank
//! lines: front matter, code, link targets and tags are removed.
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::traits::DocumentLoader;
use crate::types::Document;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["md", "markdown", "html", "htm", "txt"];

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        #[allow(clippy::unwrap_used)]
        static $name: Lazy<Regex> = Lazy::new(|| Regex::new($re).unwrap());
    };
}

pattern!(FRONTMATTER_RE, r"(?s)\A---\n.*?\n---\n");
pattern!(HEADING_RE, r"(?m)^(#{1,6})\s*(.+)$");
pattern!(CODEBLOCK_RE, r"(?s)```.*?```");
pattern!(INLINE_CODE_RE, r"`([^`]+)`");
pattern!(LINK_RE, r"\[([^\]]+)\]\([^\)]+\)");
pattern!(IMAGE_RE, r"!\[([^\]]*)\]\([^\)]+\)");
pattern!(HTML_TAG_RE, r"<[^>]+>");
pattern!(MULTISPACE_RE, r"[ \t]{2,}");
pattern!(NEWLINE_RE, r"\n{3,}");
pattern!(LIST_MARKER_RE, r"(?m)^\s*([*+-]|\d+\.)\s+");

/// Apply the cleanup pipeline to raw Markdown or HTML.
pub fn clean_text(raw: &str) -> String {
    let text = FRONTMATTER_RE.replacen(raw, 1, "");
    let text = CODEBLOCK_RE.replace_all(&text, "");
    let text = INLINE_CODE_RE.replace_all(&text, "$1");
    let text = IMAGE_RE.replace_all(&text, "$1");
    let text = LINK_RE.replace_all(&text, "$1");
    let text = HEADING_RE.replace_all(&text, |caps: &Captures| {
        let level = caps[1].len();
        let heading = caps[2].trim();
        let underline = "-".repeat((level + 1).max(heading.chars().count()));
        format!("{heading}\n{underline}")
    });
    let text = LIST_MARKER_RE.replace_all(&text, "- ");
    let text = HTML_TAG_RE.replace_all(&text, "");
    let text = MULTISPACE_RE.replace_all(&text, " ");
    let text = NEWLINE_RE.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Parse one file into a [`Document`]. The title is the first line of the
/// cleaned text, or the file stem when the text has a single line.
pub fn parse_document(path: &Path) -> Result<Document> {
    let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => {
            Error::InvalidFormat(format!("{} is not valid UTF-8", path.display()))
        }
        _ => Error::from_io_at(e, path),
    })?;
    let text = clean_text(&raw);
    let title = match text.split_once('\n') {
        Some((first, _)) => first.trim().to_string(),
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default(),
    };
    Ok(Document { path: path.to_path_buf(), text, title })
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

/// Every supported file under `sources`, in source order then sorted walk order.
pub fn source_files(sources: &[PathBuf], extensions: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in sources {
        let root = fs::canonicalize(root).unwrap_or_else(|_| root.clone());
        if root.is_file() {
            if has_extension(&root, extensions) {
                files.push(root);
            }
            continue;
        }
        if root.is_dir() {
            for entry in walkdir::WalkDir::new(&root)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| match e {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        warn!("skipping unreadable entry under {}: {err}", root.display());
                        None
                    }
                })
                .filter(|e| e.file_type().is_file())
            {
                if has_extension(entry.path(), extensions) {
                    files.push(entry.path().to_path_buf());
                }
            }
        }
    }
    files
}

#[derive(Debug, Clone)]
pub struct MarkdownLoader {
    extensions: Vec<String>,
}

impl Default for MarkdownLoader {
    fn default() -> Self {
        Self { extensions: SUPPORTED_EXTENSIONS.iter().map(|s| s.to_string()).collect() }
    }
}

impl MarkdownLoader {
    pub fn new() -> Self { Self::default() }

    pub fn with_extensions<S: AsRef<str>>(extensions: &[S]) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_string())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn extensions(&self) -> &[String] { &self.extensions }

    /// Supported files under `sources`; errors when nothing is configured or found.
    pub fn collect_files(&self, sources: &[PathBuf]) -> Result<Vec<PathBuf>> {
        if sources.is_empty() {
            return Err(Error::InvalidConfig("no sources given".into()));
        }
        let files = source_files(sources, &self.extensions);
        if files.is_empty() {
            return Err(Error::NoDocuments(describe(sources)));
        }
        Ok(files)
    }
}

impl DocumentLoader for MarkdownLoader {
    fn load(&self, sources: &[PathBuf]) -> Result<Vec<Document>> {
        let files = self.collect_files(sources)?;
        let mut documents = Vec::with_capacity(files.len());
        for path in &files {
            match parse_document(path) {
                Ok(doc) => {
                    debug!(path = %path.display(), title = %doc.title, "loaded document");
                    documents.push(doc);
                }
                Err(Error::InvalidFormat(reason)) => warn!("skipping {reason}"),
                Err(e) => return Err(e),
            }
        }
        if documents.is_empty() {
            return Err(Error::NoDocuments(describe(sources)));
        }
        Ok(documents)
    }
}

fn describe(sources: &[PathBuf]) -> String {
    sources.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_front_matter_code_and_links() {
        let raw = "---\ntitle: x\n---\nIntro with `code` and [a link](http://x).\n\n```rust\nfn main() {}\n```\n\n![logo](logo.png) <b>bold</b>";
        assert_eq!(clean_text(raw), "Intro with code and a link.\n\nlogo bold");
    }

    #[test]
    fn headings_get_dash_underline() {
        assert_eq!(clean_text("# Setup\n\nText"), "Setup\n-----\n\nText");
        assert_eq!(clean_text("### Go"), "Go\n----");
    }

    #[test]
    fn list_markers_and_whitespace_are_normalised() {
        let raw = "* one\n+ two\n3. three\n\n\n\nend    here";
        assert_eq!(clean_text(raw), "- one\n- two\n- three\n\nend here");
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directories_do_not_abort_discovery() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("a.md"), "A").unwrap();
        let locked = tmp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("b.md"), "B").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let extensions = vec!["md".to_string()];
        let files = source_files(&[tmp.path().to_path_buf()], &extensions);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        // root can still read the locked directory
        assert!(files.iter().any(|f| f.ends_with("a.md")));
        assert!(files.len() <= 2);
    }
}
