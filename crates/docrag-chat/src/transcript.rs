//! Recorded chat turns with aggregate statistics, persisted as JSON.
//!
//! Loading is lenient about stray entries: non-object items in `turns`,
//! `context` or `prompt` are skipped, as are prompt messages with an unknown
//! role. Missing required keys are reported as `InvalidFormat`.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use docrag_core::error::{Error, Result};
use docrag_core::types::{round6, ChunkId, ChunkMetadata, SearchResult};

use crate::prompt::{ChatMessage, ChatTurn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptContext {
    pub chunk_id: ChunkId,
    pub score: f64,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl TranscriptContext {
    pub fn source_key(&self) -> String { self.metadata.source_key(&self.chunk_id) }
}

impl From<&SearchResult> for TranscriptContext {
    fn from(result: &SearchResult) -> Self {
        Self {
            chunk_id: result.chunk_id.clone(),
            score: result.score,
            text: result.text.clone(),
            metadata: result.metadata.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptTurn {
    pub question: String,
    pub response: String,
    pub context: Vec<TranscriptContext>,
    pub prompt: Vec<ChatMessage>,
}

impl TranscriptTurn {
    pub fn from_turn(question: &str, turn: &ChatTurn) -> Self {
        Self {
            question: question.to_string(),
            response: turn.response.clone(),
            context: turn.prompt.context.iter().map(TranscriptContext::from).collect(),
            prompt: turn.prompt.messages.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TranscriptStats {
    pub turns: usize,
    pub context_items: usize,
    pub average_score: f64,
    pub unique_sources: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatTranscript {
    turns: Vec<TranscriptTurn>,
}

impl ChatTranscript {
    pub fn new() -> Self { Self::default() }

    pub fn turns(&self) -> &[TranscriptTurn] { &self.turns }

    pub fn len(&self) -> usize { self.turns.len() }

    pub fn is_empty(&self) -> bool { self.turns.is_empty() }

    pub fn record(&mut self, question: &str, turn: &ChatTurn) {
        self.turns.push(TranscriptTurn::from_turn(question, turn));
    }

    pub fn extend<I: IntoIterator<Item = TranscriptTurn>>(&mut self, turns: I) {
        self.turns.extend(turns);
    }

    pub fn clear(&mut self) { self.turns.clear(); }

    pub fn stats(&self) -> TranscriptStats {
        let mut scores = Vec::new();
        let mut sources = HashSet::new();
        for item in self.turns.iter().flat_map(|t| &t.context) {
            scores.push(item.score);
            sources.insert(item.source_key());
        }
        let average = if scores.is_empty() { 0.0 } else { scores.iter().sum::<f64>() / scores.len() as f64 };
        TranscriptStats {
            turns: self.turns.len(),
            context_items: scores.len(),
            average_score: round6(average),
            unique_sources: sources.len(),
        }
    }

    pub fn to_json(&self, include_stats: bool) -> Value {
        let mut root = json!({ "turns": self.turns });
        if include_stats {
            root["stats"] = json!(self.stats());
        }
        root
    }

    /// Pretty JSON with a trailing newline; parent directories are created.
    pub fn save(&self, path: &Path, include_stats: bool) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() { fs::create_dir_all(parent)?; }
        }
        let mut text = serde_json::to_string_pretty(&self.to_json(include_stats))?;
        text.push('\n');
        fs::write(path, text)?;
        info!(path = %path.display(), turns = self.turns.len(), "transcript saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::from_io_at(e, path))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(text)
            .map_err(|e| Error::InvalidFormat(format!("transcript is not valid JSON: {e}")))?;
        Self::from_value(&root)
    }

    pub fn from_value(root: &Value) -> Result<Self> {
        let root = root
            .as_object()
            .ok_or_else(|| Error::InvalidFormat("transcript must be a JSON object".into()))?;
        let turns = root
            .get("turns")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::InvalidFormat("transcript 'turns' is missing or not a list".into()))?;
        let turns = turns
            .iter()
            .filter_map(Value::as_object)
            .map(parse_turn)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { turns })
    }
}

fn required_str(map: &Map<String, Value>, key: &str, what: &str) -> Result<String> {
    match map.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) | None => Err(Error::InvalidFormat(format!("{what} is missing '{key}'"))),
        Some(other) => Ok(other.to_string()),
    }
}

fn objects<'a>(map: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a Map<String, Value>> {
    map.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn parse_context(map: &Map<String, Value>) -> Result<TranscriptContext> {
    let score = map
        .get("score")
        .and_then(Value::as_f64)
        .ok_or_else(|| Error::InvalidFormat("context entry has no numeric 'score'".into()))?;
    let metadata = match map.get("metadata") {
        Some(meta @ Value::Object(_)) => serde_json::from_value(meta.clone()).unwrap_or_else(|e| {
            warn!("ignoring unreadable context metadata: {e}");
            ChunkMetadata::default()
        }),
        _ => ChunkMetadata::default(),
    };
    Ok(TranscriptContext {
        chunk_id: required_str(map, "chunk_id", "context entry")?,
        score,
        text: required_str(map, "text", "context entry")?,
        metadata,
    })
}

fn parse_turn(map: &Map<String, Value>) -> Result<TranscriptTurn> {
    let question = required_str(map, "question", "turn")?;
    let response = required_str(map, "response", "turn")?;
    let context = objects(map, "context").map(parse_context).collect::<Result<Vec<_>>>()?;
    let prompt = objects(map, "prompt")
        .filter_map(|m| {
            let role = m.get("role").and_then(Value::as_str).unwrap_or_default();
            match role.parse() {
                Ok(role) => {
                    let content = m.get("content").and_then(Value::as_str).unwrap_or_default();
                    Some(ChatMessage::new(role, content))
                }
                Err(e) => {
                    warn!("skipping prompt message: {e}");
                    None
                }
            }
        })
        .collect();
    Ok(TranscriptTurn { question, response, context, prompt })
}
