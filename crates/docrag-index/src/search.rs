use std::cmp::Ordering;
use std::path::Path;

use docrag_core::error::{Error, Result};
use docrag_core::traits::Retriever;
use docrag_core::types::{round6, SearchResult};

use crate::store::{IndexArtifact, IndexedChunk};
use crate::vectorizer::Vectorizer;

/// A loaded, read-only TF-IDF index answering cosine-similarity queries.
#[derive(Debug, Clone)]
pub struct SemanticIndex {
    vocabulary: Vec<String>,
    vectorizer: Vectorizer,
    chunks: Vec<IndexedChunk>,
}

impl SemanticIndex {
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_artifact(IndexArtifact::load(path)?)
    }

    pub fn from_artifact(artifact: IndexArtifact) -> Result<Self> {
        let vectorizer = Vectorizer::new(&artifact.vocabulary, artifact.idf)?;
        Ok(Self { vocabulary: artifact.vocabulary, vectorizer, chunks: artifact.chunks })
    }

    pub fn vocabulary(&self) -> &[String] { &self.vocabulary }

    pub fn chunks(&self) -> &[IndexedChunk] { &self.chunks }

    pub fn len(&self) -> usize { self.chunks.len() }

    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    /// Top `top_k` chunks with similarity at least `min_score`, best first.
    /// Equal scores keep index order.
    pub fn search(&self, query: &str, top_k: usize, min_score: f64) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be greater than 0".into()));
        }
        let query_vector = self.vectorizer.vectorize(query);
        if query_vector.is_empty() {
            return Ok(Vec::new());
        }
        let query_norm = query_vector.norm();
        if query_norm == 0.0 {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        for chunk in &self.chunks {
            if chunk.norm == 0.0 {
                continue;
            }
            let dot = query_vector.dot(&chunk.vector);
            if dot <= 0.0 {
                continue;
            }
            let similarity = dot / (chunk.norm * query_norm);
            if similarity >= min_score {
                results.push(SearchResult {
                    chunk_id: chunk.id.clone(),
                    score: round6(similarity),
                    text: chunk.text.clone(),
                    metadata: chunk.metadata.clone(),
                });
            }
        }

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results.truncate(top_k);
        Ok(results)
    }
}

impl Retriever for SemanticIndex {
    fn retrieve(&self, query: &str, top_k: usize, min_score: f64) -> Result<Vec<SearchResult>> {
        self.search(query, top_k, min_score)
    }
}
