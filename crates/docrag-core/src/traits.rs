use std::path::PathBuf;

use crate::error::Result;
use crate::types::{Document, SearchResult};

pub trait DocumentLoader: Send + Sync {
    /// Cleaned documents for the given files and directories, in a stable order.
    fn load(&self, sources: &[PathBuf]) -> Result<Vec<Document>>;
}

pub trait Retriever: Send + Sync {
    fn retrieve(&self, query: &str, top_k: usize, min_score: f64) -> Result<Vec<SearchResult>>;
}
