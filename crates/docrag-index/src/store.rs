//! Index artifact: build, persist and load the `{vocabulary, idf, chunks}` JSON.
//!
//! Loading is tolerant of malformed vector pairs (skipped one by one) but
//! strict about the document shape: the root must be an object and the IDF
//! table must line up with the vocabulary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use docrag_core::corpus::read_corpus;
use docrag_core::error::{Error, Result};
use docrag_core::tokenizer::tokenize;
use docrag_core::types::{round6, ChunkId, ChunkMetadata, ChunkRecord};

use crate::vectorizer::{check_schema, Vectorizer};
use crate::vocabulary::{build_vocabulary, compute_idf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub id: ChunkId,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// `(feature_id, weight)` sorted by feature id, weights at 6 decimals.
    pub vector: Vec<(usize, f64)>,
    pub norm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexArtifact {
    pub vocabulary: Vec<String>,
    pub idf: Vec<f64>,
    pub chunks: Vec<IndexedChunk>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawArtifact {
    vocabulary: Vec<String>,
    idf: Vec<f64>,
    chunks: Vec<RawChunk>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawChunk {
    id: Value,
    text: Value,
    metadata: ChunkMetadata,
    vector: Vec<Value>,
    norm: f64,
}

fn parse_pair(pair: &Value, vocabulary_size: usize) -> Option<(usize, f64)> {
    let [id, weight] = pair.as_array()?.as_slice() else { return None };
    let id = match id.as_u64() {
        Some(i) => i,
        None => {
            let f = id.as_f64()?;
            if f < 0.0 || f.fract() != 0.0 { return None; }
            f as u64
        }
    };
    let id = usize::try_from(id).ok().filter(|i| *i < vocabulary_size)?;
    Some((id, weight.as_f64()?))
}

/// Strings pass through; other scalars use their JSON text; null becomes empty.
fn scalar_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl RawChunk {
    fn into_chunk(self, vocabulary_size: usize) -> IndexedChunk {
        let id = scalar_text(self.id);
        let mut skipped = 0usize;
        // later duplicates of a feature id replace earlier ones
        let mut pairs: BTreeMap<usize, f64> = BTreeMap::new();
        for pair in &self.vector {
            match parse_pair(pair, vocabulary_size) {
                Some((id, weight)) => { pairs.insert(id, weight); }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(chunk = %id, skipped, "skipping malformed vector pairs");
        }
        IndexedChunk {
            id,
            text: scalar_text(self.text),
            metadata: self.metadata,
            vector: pairs.into_iter().collect(),
            norm: self.norm,
        }
    }
}

impl IndexArtifact {
    pub fn build(records: &[ChunkRecord], max_features: Option<usize>, min_term_length: usize) -> Result<Self> {
        let tokenised: Vec<Vec<String>> = records.iter().map(|r| tokenize(&r.text)).collect();
        let vocabulary = build_vocabulary(&tokenised, max_features, min_term_length)?;
        let idf = compute_idf(&tokenised, &vocabulary);
        let vectorizer = Vectorizer::new(&vocabulary, idf.clone())?;

        let chunks = records
            .iter()
            .zip(&tokenised)
            .map(|(record, tokens)| {
                let vector = vectorizer.vectorize_tokens(tokens);
                IndexedChunk {
                    id: record.id.clone(),
                    text: record.text.clone(),
                    metadata: record.metadata(),
                    vector: vector.rounded(),
                    norm: round6(vector.norm()),
                }
            })
            .collect();
        Ok(Self { vocabulary, idf, chunks })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(json)
            .map_err(|e| Error::InvalidFormat(format!("index is not valid JSON: {e}")))?;
        if !root.is_object() {
            return Err(Error::InvalidFormat("index root must be a JSON object".into()));
        }
        let raw: RawArtifact = serde_json::from_value(root)
            .map_err(|e| Error::InvalidFormat(format!("index has an unexpected shape: {e}")))?;
        check_schema(&raw.vocabulary, &raw.idf)?;

        let size = raw.vocabulary.len();
        let chunks = raw.chunks.into_iter().map(|c| c.into_chunk(size)).collect();
        Ok(Self { vocabulary: raw.vocabulary, idf: raw.idf, chunks })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| Error::from_io_at(e, path))?;
        let artifact = Self::from_json(&json)?;
        debug!(path = %path.display(), chunks = artifact.chunks.len(), terms = artifact.vocabulary.len(), "loaded index");
        Ok(artifact)
    }

    /// Write via a temp file in the target directory, then rename into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub corpus_path: PathBuf,
    pub output_path: PathBuf,
    pub max_features: Option<usize>,
    pub min_term_length: usize,
}

impl IndexOptions {
    pub fn new(corpus_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            corpus_path: corpus_path.into(),
            output_path: output_path.into(),
            max_features: None,
            min_term_length: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    pub chunks: usize,
    pub vocabulary_size: usize,
    pub output_path: PathBuf,
}

pub fn build_index(options: &IndexOptions) -> Result<IndexSummary> {
    let records = read_corpus(&options.corpus_path)?;
    let artifact = IndexArtifact::build(&records, options.max_features, options.min_term_length)?;
    artifact.save(&options.output_path)?;
    info!(chunks = artifact.chunks.len(), terms = artifact.vocabulary.len(), path = %options.output_path.display(), "index written");
    Ok(IndexSummary {
        chunks: artifact.chunks.len(),
        vocabulary_size: artifact.vocabulary.len(),
        output_path: options.output_path.clone(),
    })
}
