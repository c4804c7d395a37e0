use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use docrag_chat::eval::load_questions;
use docrag_chat::{ChatSession, ChatTranscript};
use docrag_cli::{build_responder, init_tracing, load_settings, session_options};
use docrag_core::config::ResponderKind;
use docrag_index::SemanticIndex;

#[derive(Parser)]
#[command(name = "docrag-eval", version, about = "Run a list of questions against the index and record a transcript")]
struct Cli {
    /// Text file with one question per line; blank lines and '#' comments are ignored
    questions: PathBuf,

    #[arg(long)]
    index: Option<PathBuf>,

    /// Transcript output (default: paths.transcript)
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long)]
    top_k: Option<usize>,

    #[arg(long)]
    min_score: Option<f64>,

    #[arg(long)]
    history_limit: Option<usize>,

    #[arg(long)]
    responder: Option<ResponderKind>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let settings = load_settings()?;

    let index = SemanticIndex::load(&cli.index.unwrap_or_else(|| settings.paths.index()))?;
    let questions = load_questions(&cli.questions)?;
    let responder = build_responder(&settings.responder, cli.responder)?;
    let options = session_options(&settings.chat, cli.top_k, cli.min_score, cli.history_limit);
    let mut session = ChatSession::new(index, responder, options)?.with_transcript(ChatTranscript::new());

    let pb = ProgressBar::new(questions.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} questions {msg}")?
            .progress_chars("#>-"),
    );
    for question in &questions {
        let turn = session.send(question)?;
        pb.suspend(|| println!("Question: {question}\nAnswer:\n{}\n", turn.response));
        pb.inc(1);
    }
    pb.finish_with_message("done");

    let output = cli.output.unwrap_or_else(|| settings.paths.transcript());
    if let Some(transcript) = session.take_transcript() {
        transcript.save(&output, true)?;
        let stats = transcript.stats();
        println!(
            "Transcript saved to {} (turns: {}, unique sources: {}).",
            output.display(),
            stats.turns,
            stats.unique_sources
        );
    }
    Ok(())
}
