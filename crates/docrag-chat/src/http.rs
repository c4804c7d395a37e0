//! Relay prompts to an external chat service over HTTP.
//!
//! Request body: `{"messages": [{role, content}], "context": [{id, text, score, metadata}]}`.
//! The answer is taken from the first non-empty of `answer`, `message.content`,
//! `choices[].message.content`, `choices[].text`, `output` and `output_text`.

use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use docrag_core::error::{Error, Result};
use docrag_core::types::ChunkMetadata;

use crate::prompt::{ChatMessage, ChatPrompt};
use crate::responder::Responder;

pub const DEFAULT_TIMEOUT_SECS: f64 = 60.0;
pub const MIN_TIMEOUT_SECS: f64 = 1.0;
const MAX_ATTEMPTS: u32 = 2;
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct HttpResponderOptions {
    pub endpoint: String,
    pub token: Option<String>,
    /// `None` or a non-positive value means the default; anything else is
    /// raised to at least one second.
    pub timeout_secs: Option<f64>,
    pub require_context: bool,
}

impl HttpResponderOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), token: None, timeout_secs: None, require_context: true }
    }
}

fn resolve_timeout(secs: Option<f64>) -> Duration {
    let secs = match secs {
        Some(s) if s > 0.0 && s.is_finite() => s.max(MIN_TIMEOUT_SECS),
        _ => DEFAULT_TIMEOUT_SECS,
    };
    Duration::from_secs_f64(secs)
}

#[derive(Serialize)]
struct ContextPayload<'a> {
    id: &'a str,
    text: &'a str,
    score: f64,
    metadata: &'a ChunkMetadata,
}

#[derive(Serialize)]
struct RequestPayload<'a> {
    messages: &'a [ChatMessage],
    context: Vec<ContextPayload<'a>>,
}

pub struct HttpResponder {
    client: Client,
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
    require_context: bool,
}

impl HttpResponder {
    pub fn new(options: HttpResponderOptions) -> Result<Self> {
        let endpoint = options.endpoint.trim().to_string();
        if endpoint.is_empty() {
            return Err(Error::InvalidConfig("chat service URL is not configured".into()));
        }
        let timeout = resolve_timeout(options.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Responder(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            token: options.token.filter(|t| !t.trim().is_empty()),
            timeout,
            require_context: options.require_context,
        })
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }

    pub fn timeout(&self) -> Duration { self.timeout }

    fn send(&self, payload: &RequestPayload<'_>) -> Result<reqwest::blocking::Response> {
        let mut attempt = 0;
        loop {
            let mut request = self.client.post(&self.endpoint).json(payload);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }
            match request.send() {
                Ok(response) => return Ok(response),
                Err(e) => {
                    attempt += 1;
                    if attempt >= MAX_ATTEMPTS || !e.is_timeout() {
                        return Err(Error::Responder(format!("failed to contact chat service: {e}")));
                    }
                    warn!(attempt, endpoint = %self.endpoint, "chat service timed out, retrying");
                    thread::sleep(RETRY_BACKOFF * attempt);
                }
            }
        }
    }
}

impl Responder for HttpResponder {
    fn respond(&self, prompt: &ChatPrompt) -> Result<String> {
        if self.require_context && prompt.context.is_empty() {
            return Err(Error::Responder("chat responder requires context to build an answer".into()));
        }
        let payload = RequestPayload {
            messages: &prompt.messages,
            context: prompt
                .context
                .iter()
                .map(|c| ContextPayload { id: &c.chunk_id, text: &c.text, score: c.score, metadata: &c.metadata })
                .collect(),
        };

        let response = self.send(&payload)?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| Error::Responder(format!("failed to read chat service response: {e}")))?;
        debug!(status = status.as_u16(), bytes = body.len(), "chat service responded");
        if !status.is_success() {
            return Err(Error::Responder(format!("chat service returned HTTP {}: {}", status.as_u16(), body)));
        }

        let payload: Value = serde_json::from_str(&body)
            .ok()
            .filter(|v: &Value| v.is_object() || v.is_array())
            .ok_or_else(|| Error::Responder("chat service responded with an invalid payload".into()))?;
        extract_answer(&payload)
            .map(|answer| answer.trim().to_string())
            .ok_or_else(|| Error::Responder("chat service did not provide an answer".into()))
    }
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value?.as_str().filter(|s| !s.trim().is_empty()).map(str::to_string)
}

fn is_container(value: &Value) -> bool { value.is_object() || value.is_array() }

fn elements(value: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match value {
        Value::Array(items) => Box::new(items.iter()),
        Value::Object(map) => Box::new(map.values()),
        _ => Box::new(std::iter::empty()),
    }
}

/// First usable answer string in a chat service payload.
pub fn extract_answer(payload: &Value) -> Option<String> {
    if let Some(answer) = non_blank(payload.get("answer")) {
        return Some(answer);
    }
    if let Some(message) = payload.get("message").filter(|m| is_container(m)) {
        if let Some(content) = normalise_content(message.get("content")) {
            return Some(content);
        }
    }
    if let Some(choices) = payload.get("choices").filter(|c| is_container(c)) {
        for choice in elements(choices).filter(|c| is_container(c)) {
            if let Some(message) = choice.get("message").filter(|m| is_container(m)) {
                if let Some(content) = normalise_content(message.get("content")) {
                    return Some(content);
                }
            }
            if let Some(text) = non_blank(choice.get("text")) {
                return Some(text);
            }
        }
    }
    if let Some(content) = normalise_content(payload.get("output")) {
        return Some(content);
    }
    non_blank(payload.get("output_text"))
}

/// A plain string, or the concatenated text segments of structured content.
fn normalise_content(content: Option<&Value>) -> Option<String> {
    let content = content?;
    if let Some(text) = content.as_str() {
        return (!text.trim().is_empty()).then(|| text.to_string());
    }
    if !is_container(content) {
        return None;
    }
    let mut segments = Vec::new();
    collect_segments(content, &mut segments);
    let combined = segments.concat();
    (!combined.trim().is_empty()).then_some(combined)
}

fn collect_segments(node: &Value, out: &mut Vec<String>) {
    match node {
        Value::String(s) => out.push(s.clone()),
        Value::Object(map) => {
            for key in ["text", "value"] {
                if let Some(s) = map.get(key).and_then(Value::as_str) {
                    out.push(s.to_string());
                }
            }
            for key in ["content", "output"] {
                if let Some(nested) = map.get(key) {
                    collect_segments(nested, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_segments(item, out);
            }
        }
        _ => {}
    }
}
