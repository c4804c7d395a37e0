use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use docrag_core::types::SearchResult;

pub const CONTEXT_HEADER: &str = "Context from the knowledge base:\n";
pub const SUMMARY_LIMIT: usize = 420;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        })
    }
}

impl FromStr for ChatRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(ChatRole::System),
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            other => Err(format!("unknown chat role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self { Self::new(ChatRole::System, content) }
    pub fn user(content: impl Into<String>) -> Self { Self::new(ChatRole::User, content) }
    pub fn assistant(content: impl Into<String>) -> Self { Self::new(ChatRole::Assistant, content) }
}

/// Everything a responder sees for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    pub messages: Vec<ChatMessage>,
    pub context: Vec<SearchResult>,
}

impl ChatPrompt {
    /// Content of the most recent user message, if any.
    pub fn question(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub response: String,
    pub prompt: ChatPrompt,
}

/// Collapse whitespace and cap at `limit` characters, ending in `…` when cut.
pub fn summarise(text: &str, limit: usize) -> String {
    let condensed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if condensed.chars().count() <= limit {
        return condensed;
    }
    let mut cut: String = condensed.chars().take(limit.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// `title (section N)`, `title`, `source`, or the chunk id.
pub fn format_source(result: &SearchResult) -> String {
    let meta = &result.metadata;
    if let Some(title) = meta.title.as_deref().filter(|t| !t.is_empty()) {
        return match meta.chunk_index {
            Some(index) => format!("{title} (section {index})"),
            None => title.to_string(),
        };
    }
    match meta.source.as_deref().filter(|s| !s.is_empty()) {
        Some(source) => source.to_string(),
        None => result.chunk_id.clone(),
    }
}

/// System message listing the retrieved chunks, or `None` without context.
pub fn context_message(context: &[SearchResult]) -> Option<ChatMessage> {
    if context.is_empty() {
        return None;
    }
    let mut blocks = vec![CONTEXT_HEADER.to_string()];
    for (position, item) in context.iter().enumerate() {
        blocks.push(format!(
            "[{}] {}\n{}",
            position + 1,
            format_source(item),
            summarise(&item.text, SUMMARY_LIMIT)
        ));
    }
    Some(ChatMessage::system(blocks.join("\n\n")))
}
