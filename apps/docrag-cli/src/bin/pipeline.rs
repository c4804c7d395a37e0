use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use docrag_cli::{init_tracing, load_settings};
use docrag_core::chunker::ChunkingConfig;
use docrag_index::{run_pipeline, PipelineOptions};

#[derive(Parser)]
#[command(name = "docrag-pipeline", version, about = "Build the knowledge base corpus and TF-IDF index")]
struct Cli {
    /// Files or directories to index (default: paths.sources)
    sources: Vec<PathBuf>,

    /// Corpus output (NDJSON)
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Index output (JSON)
    #[arg(long)]
    index: Option<PathBuf>,

    /// Maximum words per chunk
    #[arg(long)]
    max_words: Option<usize>,

    /// Words shared between consecutive chunks
    #[arg(long)]
    overlap: Option<usize>,

    /// Keep only the most frequent terms
    #[arg(long)]
    max_features: Option<usize>,

    #[arg(long)]
    min_term_length: Option<usize>,

    /// Rebuild even when the outputs are up to date
    #[arg(long)]
    force: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let settings = load_settings()?;

    let sources = if cli.sources.is_empty() { settings.paths.sources() } else { cli.sources };
    let chunking = ChunkingConfig::new(
        cli.max_words.unwrap_or(settings.chunking.max_words),
        cli.overlap.unwrap_or(settings.chunking.overlap),
    )?;
    let options = PipelineOptions {
        sources,
        corpus_path: cli.corpus.unwrap_or_else(|| settings.paths.corpus()),
        index_path: cli.index.unwrap_or_else(|| settings.paths.index()),
        chunking,
        max_features: cli.max_features.or(settings.index.max_features),
        min_term_length: cli.min_term_length.unwrap_or(settings.index.min_term_length),
        force: cli.force,
    };

    println!("docrag pipeline\n===============");
    let result = run_pipeline(&options, &settings.paths.loader())?;
    if let Some(corpus) = &result.corpus {
        println!(
            "Corpus: {} documents, {} chunks, {} words per chunk on average -> {}",
            corpus.documents,
            corpus.chunks,
            corpus.average_words,
            corpus.output_path.display()
        );
    }
    if let Some(index) = &result.index {
        println!(
            "Index: {} chunks, {} terms -> {}",
            index.chunks,
            index.vocabulary_size,
            index.output_path.display()
        );
    }
    for stage in &result.skipped {
        println!("Skipped {stage}: already up to date (use --force to rebuild)");
    }
    Ok(())
}
