use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use docrag_chat::report::{format_report, load_report};
use docrag_cli::{init_tracing, load_settings};

#[derive(Parser)]
#[command(name = "docrag-report", version, about = "Summarise a saved chat transcript")]
struct Cli {
    /// Transcript JSON (default: paths.transcript)
    transcript: Option<PathBuf>,

    /// Number of sources to list
    #[arg(long, default_value_t = 5)]
    top: usize,

    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let path = match cli.transcript {
        Some(path) => path,
        None => load_settings()?.paths.transcript(),
    };

    let report = load_report(&path)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_report(&report, cli.top));
    }
    Ok(())
}
