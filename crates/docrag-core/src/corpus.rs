use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::chunker::{chunk_paragraphs, split_paragraphs, ChunkingConfig};
use crate::error::{Error, Result};
use crate::traits::DocumentLoader;
use crate::types::{round2, ChunkRecord, Document};

#[derive(Debug, Clone)]
pub struct CorpusOptions {
    pub sources: Vec<PathBuf>,
    pub output_path: PathBuf,
    pub chunking: ChunkingConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorpusSummary {
    pub documents: usize,
    pub chunks: usize,
    pub average_words: f64,
    pub output_path: PathBuf,
}

/// Chunk records for one document, ids numbered from `0000`.
pub fn document_records(document: &Document, chunking: ChunkingConfig) -> Vec<ChunkRecord> {
    let stem = document.stem();
    let source = document.source();
    chunk_paragraphs(split_paragraphs(&document.text), chunking)
        .enumerate()
        .map(|(index, chunk)| ChunkRecord {
            id: format!("{stem}:{index:04}"),
            source: source.clone(),
            title: document.title.clone(),
            chunk_index: index,
            word_count: chunk.word_count,
            text: chunk.text,
        })
        .collect()
}

/// Load, chunk and write the corpus as one JSON record per line.
pub fn build_corpus(options: &CorpusOptions, loader: &dyn DocumentLoader) -> Result<CorpusSummary> {
    if options.chunking.max_words == 0 {
        return Err(Error::InvalidConfig("max_words must be greater than 0".into()));
    }
    let documents = loader.load(&options.sources)?;

    if let Some(parent) = options.output_path.parent() {
        if !parent.as_os_str().is_empty() { fs::create_dir_all(parent)?; }
    }
    let mut writer = BufWriter::new(File::create(&options.output_path)?);
    let mut chunk_count = 0usize;
    let mut word_total = 0usize;
    for document in &documents {
        let records = document_records(document, options.chunking);
        debug!(source = %document.source(), chunks = records.len(), "chunked document");
        for record in &records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
            word_total += record.word_count;
        }
        chunk_count += records.len();
    }
    writer.flush()?;

    let average_words = if chunk_count == 0 { 0.0 } else { round2(word_total as f64 / chunk_count as f64) };
    info!(documents = documents.len(), chunks = chunk_count, average_words, path = %options.output_path.display(), "corpus written");
    Ok(CorpusSummary {
        documents: documents.len(),
        chunks: chunk_count,
        average_words,
        output_path: options.output_path.clone(),
    })
}

/// Read a corpus file back; blank lines are ignored.
pub fn read_corpus(path: &Path) -> Result<Vec<ChunkRecord>> {
    let file = File::open(path).map_err(|e| Error::from_io_at(e, path))?;
    let mut records = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() { continue; }
        let record: ChunkRecord = serde_json::from_str(line).map_err(|e| {
            Error::InvalidFormat(format!("{} line {}: {}", path.display(), line_no + 1, e))
        })?;
        records.push(record);
    }
    Ok(records)
}
