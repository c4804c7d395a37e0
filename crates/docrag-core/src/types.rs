//! Domain types shared by the corpus, index and chat crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub type ChunkId = String;

/// One line of the corpus file.
///
/// - `id`: `"{document_stem}:{chunk_index:04}"`
/// - `source`: path of the source document (forward slashes)
/// - `title`: document title as found by the loader
/// - `chunk_index`/`word_count`: position within the document and chunk size
/// - `text`: the chunk's words joined by single spaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: ChunkId,
    pub source: String,
    pub title: String,
    pub chunk_index: usize,
    pub word_count: usize,
    pub text: String,
}

impl ChunkRecord {
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            source: Some(self.source.clone()),
            title: Some(self.title.clone()),
            chunk_index: Some(self.chunk_index),
            word_count: Some(self.word_count),
        }
    }
}

/// Metadata carried alongside an indexed chunk. Every field is optional so
/// artifacts written by other tools still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
}

impl ChunkMetadata {
    /// Key used to group hits by origin: source, else title, else `fallback`.
    pub fn source_key(&self, fallback: &str) -> String {
        self.source
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.title.as_deref().filter(|t| !t.is_empty()))
            .unwrap_or(fallback)
            .to_string()
    }
}

/// A ranked chunk returned for a query. Owns copies of everything it reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: ChunkId,
    pub score: f64,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A cleaned source document ready for chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub text: String,
    pub title: String,
}

impl Document {
    pub fn source(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }

    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Output unit of the chunker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    pub word_count: usize,
}

/// Round to 6 decimal digits, the precision of every persisted float.
pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Round to 2 decimal digits.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
