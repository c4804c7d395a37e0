//! End-to-end rebuild of corpus and index, skipping stages whose outputs are
//! newer than their inputs. Staleness uses modification times only.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::info;

use docrag_core::chunker::ChunkingConfig;
use docrag_core::corpus::{build_corpus, CorpusOptions, CorpusSummary};
use docrag_core::error::Result;
use docrag_core::loader::MarkdownLoader;

use crate::store::{build_index, IndexOptions, IndexSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Corpus,
    Index,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Stage::Corpus => "corpus", Stage::Index => "index" })
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub sources: Vec<PathBuf>,
    pub corpus_path: PathBuf,
    pub index_path: PathBuf,
    pub chunking: ChunkingConfig,
    pub max_features: Option<usize>,
    pub min_term_length: usize,
    pub force: bool,
}

impl PipelineOptions {
    pub fn new(sources: Vec<PathBuf>, corpus_path: impl Into<PathBuf>, index_path: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            corpus_path: corpus_path.into(),
            index_path: index_path.into(),
            chunking: ChunkingConfig::default(),
            max_features: None,
            min_term_length: 2,
            force: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub corpus: Option<CorpusSummary>,
    pub index: Option<IndexSummary>,
    pub skipped: Vec<Stage>,
}

pub fn run_pipeline(options: &PipelineOptions, loader: &MarkdownLoader) -> Result<PipelineResult> {
    let source_files = loader.collect_files(&options.sources)?;
    let mut skipped = Vec::new();

    let corpus = if options.force || needs_rebuild(&options.corpus_path, &source_files) {
        let corpus_options = CorpusOptions {
            sources: options.sources.clone(),
            output_path: options.corpus_path.clone(),
            chunking: options.chunking,
        };
        Some(build_corpus(&corpus_options, loader)?)
    } else {
        info!(path = %options.corpus_path.display(), "corpus is up to date");
        skipped.push(Stage::Corpus);
        None
    };

    let index = if options.force
        || corpus.is_some()
        || needs_rebuild(&options.index_path, std::slice::from_ref(&options.corpus_path))
    {
        let index_options = IndexOptions {
            corpus_path: options.corpus_path.clone(),
            output_path: options.index_path.clone(),
            max_features: options.max_features,
            min_term_length: options.min_term_length,
        };
        Some(build_index(&index_options)?)
    } else {
        info!(path = %options.index_path.display(), "index is up to date");
        skipped.push(Stage::Index);
        None
    };

    Ok(PipelineResult { corpus, index, skipped })
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// True when `target` is missing or any readable dependency is newer.
fn needs_rebuild(target: &Path, dependencies: &[PathBuf]) -> bool {
    let Some(target_time) = modified(target) else { return true };
    dependencies
        .iter()
        .filter_map(|dep| modified(dep))
        .any(|dep_time| dep_time > target_time)
}
