use docrag_core::config::{ResponderKind, ResponderSettings};
use docrag_core::error::Result;

use crate::http::{HttpResponder, HttpResponderOptions};
use crate::prompt::{format_source, summarise, ChatPrompt};

const SNIPPET_LIMIT: usize = 320;
const NOTHING_FOUND: &str = "I could not find matching information in the documentation. \
Please rephrase your question or narrow down the topic.";

/// Turns a prompt into an answer.
pub trait Responder: Send + Sync {
    fn respond(&self, prompt: &ChatPrompt) -> Result<String>;
}

impl<F> Responder for F
where
    F: Fn(&ChatPrompt) -> Result<String> + Send + Sync,
{
    fn respond(&self, prompt: &ChatPrompt) -> Result<String> {
        self(prompt)
    }
}

/// Offline responder that lists the retrieved snippets.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextResponder;

impl Responder for ContextResponder {
    fn respond(&self, prompt: &ChatPrompt) -> Result<String> {
        if prompt.context.is_empty() {
            return Ok(NOTHING_FOUND.to_string());
        }
        let mut lines = vec!["Based on the knowledge base I found the following:".to_string()];
        for (position, item) in prompt.context.iter().enumerate() {
            let source = match item.metadata.title.as_deref().filter(|t| !t.is_empty()) {
                Some(title) => title.to_string(),
                None => format_source(item),
            };
            lines.push(format!("{}. {}: {}", position + 1, source, summarise(&item.text, SNIPPET_LIMIT)));
        }
        if let Some(question) = prompt.question() {
            lines.push(String::new());
            lines.push(format!("Question: {question}"));
        }
        Ok(lines.join("\n"))
    }
}

/// Responder selected by configuration.
pub fn from_settings(settings: &ResponderSettings) -> Result<Box<dyn Responder>> {
    match settings.kind {
        ResponderKind::Local => Ok(Box::new(ContextResponder)),
        ResponderKind::Http => {
            let options = HttpResponderOptions {
                endpoint: settings.url.clone().unwrap_or_default(),
                token: settings.token.clone(),
                timeout_secs: Some(settings.timeout_secs),
                require_context: settings.require_context,
            };
            Ok(Box::new(HttpResponder::new(options)?))
        }
    }
}
