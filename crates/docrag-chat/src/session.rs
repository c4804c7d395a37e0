use tracing::debug;

use docrag_core::error::{Error, Result};
use docrag_core::traits::Retriever;

use crate::prompt::{context_message, ChatMessage, ChatPrompt, ChatTurn};
use crate::responder::Responder;
use crate::transcript::ChatTranscript;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant for the project documentation. \
Answer questions using only the provided context.";

#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub system_prompt: String,
    /// User/assistant pairs kept between turns; `0` keeps none.
    pub history_limit: usize,
    pub top_k: usize,
    pub min_score: f64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            history_limit: 4,
            top_k: 3,
            min_score: 0.2,
        }
    }
}

/// A conversation over a retriever. History excludes the system prompt.
pub struct ChatSession<R: Retriever> {
    retriever: R,
    responder: Box<dyn Responder>,
    system_prompt: String,
    history_limit: usize,
    top_k: usize,
    min_score: f64,
    history: Vec<ChatMessage>,
    transcript: Option<ChatTranscript>,
}

impl<R: Retriever> ChatSession<R> {
    pub fn new(retriever: R, responder: Box<dyn Responder>, options: SessionOptions) -> Result<Self> {
        if options.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be greater than 0".into()));
        }
        Ok(Self {
            retriever,
            responder,
            system_prompt: options.system_prompt.trim().to_string(),
            history_limit: options.history_limit,
            top_k: options.top_k,
            min_score: options.min_score,
            history: Vec::new(),
            transcript: None,
        })
    }

    pub fn with_transcript(mut self, transcript: ChatTranscript) -> Self {
        self.transcript = Some(transcript);
        self
    }

    pub fn history(&self) -> &[ChatMessage] { &self.history }

    pub fn transcript(&self) -> Option<&ChatTranscript> { self.transcript.as_ref() }

    pub fn take_transcript(&mut self) -> Option<ChatTranscript> { self.transcript.take() }

    pub fn retriever(&self) -> &R { &self.retriever }

    pub fn send(&mut self, message: &str) -> Result<ChatTurn> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::InvalidInput("the user message must not be empty".into()));
        }

        let context = self.retriever.retrieve(message, self.top_k, self.min_score)?;
        debug!(hits = context.len(), "retrieved context");

        let mut messages = Vec::with_capacity(self.history.len() + 3);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend(self.history.iter().cloned());
        if let Some(ctx) = context_message(&context) {
            messages.push(ctx);
        }
        messages.push(ChatMessage::user(message));

        let prompt = ChatPrompt { messages, context };
        let response = self.responder.respond(&prompt)?.trim().to_string();
        let turn = ChatTurn { response, prompt };

        self.history.push(ChatMessage::user(message));
        self.history.push(ChatMessage::assistant(turn.response.clone()));
        self.truncate_history();

        if let Some(transcript) = self.transcript.as_mut() {
            transcript.record(message, &turn);
        }
        Ok(turn)
    }

    pub fn reset(&mut self) { self.history.clear(); }

    fn truncate_history(&mut self) {
        let max_messages = self.history_limit.saturating_mul(2);
        if self.history.len() > max_messages {
            let excess = self.history.len() - max_messages;
            self.history.drain(..excess);
        }
    }
}
