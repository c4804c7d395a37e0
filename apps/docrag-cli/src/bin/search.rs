use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use docrag_cli::{init_tracing, load_settings, source_label};
use docrag_index::SemanticIndex;

#[derive(Parser)]
#[command(name = "docrag-search", version, about = "Query the TF-IDF index")]
struct Cli {
    query: String,

    #[arg(long)]
    index: Option<PathBuf>,

    #[arg(long)]
    top_k: Option<usize>,

    #[arg(long)]
    min_score: Option<f64>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let settings = load_settings()?;

    let index_path = cli.index.unwrap_or_else(|| settings.paths.index());
    let index = SemanticIndex::load(&index_path)?;
    let results = index.search(
        &cli.query,
        cli.top_k.unwrap_or(settings.chat.top_k),
        cli.min_score.unwrap_or(settings.chat.min_score),
    )?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    println!("Found {} results for: \"{}\"", results.len(), cli.query);
    for (i, result) in results.iter().enumerate() {
        println!("\n  {}. score={:.4}  id={}  source={}", i + 1, result.score, result.chunk_id, source_label(result));
        println!("     {}", docrag_chat::prompt::summarise(&result.text, 320));
    }
    Ok(())
}
