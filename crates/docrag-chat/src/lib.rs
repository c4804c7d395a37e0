//! Chat layer on top of retrieval: prompt assembly, session history,
//! responders (local and HTTP), transcripts and transcript reports.

pub mod eval;
pub mod http;
pub mod prompt;
pub mod report;
pub mod responder;
pub mod session;
pub mod transcript;

pub use http::{HttpResponder, HttpResponderOptions};
pub use prompt::{ChatMessage, ChatPrompt, ChatRole, ChatTurn};
pub use report::{build_report, format_report, TranscriptReport};
pub use responder::{ContextResponder, Responder};
pub use session::{ChatSession, SessionOptions, DEFAULT_SYSTEM_PROMPT};
pub use transcript::{ChatTranscript, TranscriptStats, TranscriptTurn};
