//! Shared plumbing for the docrag binaries.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use docrag_chat::responder::from_settings;
use docrag_chat::{ChatTurn, Responder, SessionOptions, DEFAULT_SYSTEM_PROMPT};
use docrag_core::config::{ChatSettings, Config, ResponderKind, ResponderSettings, Settings};
use docrag_core::types::SearchResult;

/// Log to stderr so stdout only carries results. `RUST_LOG` overrides `-v`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn load_settings() -> Result<Settings> {
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    Ok(config.settings()?)
}

pub fn session_options(
    chat: &ChatSettings,
    top_k: Option<usize>,
    min_score: Option<f64>,
    history_limit: Option<usize>,
) -> SessionOptions {
    SessionOptions {
        system_prompt: chat.system_prompt.clone().unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        history_limit: history_limit.unwrap_or(chat.history_limit),
        top_k: top_k.unwrap_or(chat.top_k),
        min_score: min_score.unwrap_or(chat.min_score),
    }
}

pub fn build_responder(settings: &ResponderSettings, kind: Option<ResponderKind>) -> Result<Box<dyn Responder>> {
    let mut settings = settings.clone();
    if let Some(kind) = kind {
        settings.kind = kind;
    }
    Ok(from_settings(&settings)?)
}

pub fn source_label(result: &SearchResult) -> String {
    let meta = &result.metadata;
    meta.title
        .as_deref()
        .filter(|t| !t.is_empty())
        .or_else(|| meta.source.as_deref().filter(|s| !s.is_empty()))
        .unwrap_or(&result.chunk_id)
        .to_string()
}

pub fn format_turn(turn: &ChatTurn) -> String {
    let mut lines = Vec::new();
    if !turn.prompt.context.is_empty() {
        lines.push("Context".to_string());
        for (position, item) in turn.prompt.context.iter().enumerate() {
            lines.push(format!("[{}] {} (score: {:.2})", position + 1, source_label(item), item.score));
        }
    }
    lines.push(String::new());
    lines.push(format!("Bot: {}", turn.response));
    lines.join("\n")
}
