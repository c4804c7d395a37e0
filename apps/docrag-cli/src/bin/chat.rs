use anyhow::Result;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::warn;

use docrag_chat::{ChatSession, ChatTranscript};
use docrag_cli::{build_responder, format_turn, init_tracing, load_settings, session_options};
use docrag_core::config::ResponderKind;
use docrag_index::SemanticIndex;

#[derive(Parser)]
#[command(name = "docrag-chat", version, about = "Interactive chat over the documentation index")]
struct Cli {
    #[arg(long)]
    index: Option<PathBuf>,

    #[arg(long)]
    top_k: Option<usize>,

    #[arg(long)]
    min_score: Option<f64>,

    /// User/assistant pairs kept as history
    #[arg(long)]
    history_limit: Option<usize>,

    /// local or http
    #[arg(long)]
    responder: Option<ResponderKind>,

    /// Save the conversation here on exit
    #[arg(long)]
    transcript: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let settings = load_settings()?;

    let index = SemanticIndex::load(&cli.index.unwrap_or_else(|| settings.paths.index()))?;
    let responder = build_responder(&settings.responder, cli.responder)?;
    let options = session_options(&settings.chat, cli.top_k, cli.min_score, cli.history_limit);
    let mut session = ChatSession::new(index, responder, options)?;
    if cli.transcript.is_some() {
        session = session.with_transcript(ChatTranscript::new());
    }

    println!("docrag chat. Type 'quit' or 'exit' to leave.");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("You: ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line?;
        let input = line.trim();
        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            break;
        }
        if input.is_empty() {
            continue;
        }
        match session.send(input) {
            Ok(turn) => println!("{}\n", format_turn(&turn)),
            Err(e) => {
                warn!("turn failed: {e}");
                eprintln!("Error: {e}");
            }
        }
    }

    if let (Some(path), Some(transcript)) = (cli.transcript, session.take_transcript()) {
        transcript.save(&path, true)?;
        println!("Transcript saved to {}", path.display());
    }
    Ok(())
}
