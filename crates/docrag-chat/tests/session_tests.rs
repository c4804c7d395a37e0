use std::sync::{Arc, Mutex};

use docrag_chat::{
    ChatPrompt, ChatRole, ChatSession, ChatTranscript, ContextResponder, Responder, SessionOptions,
};
use docrag_core::error::{Error, Result};
use docrag_core::types::ChunkRecord;
use docrag_index::{IndexArtifact, SemanticIndex};

fn index() -> SemanticIndex {
    let record = |id: &str, title: &str, text: &str| ChunkRecord {
        id: id.into(),
        source: format!("docs/{title}.md"),
        title: title.into(),
        chunk_index: 0,
        word_count: text.split_whitespace().count(),
        text: text.into(),
    };
    let records = vec![
        record("install:0000", "Install", "Download the installer and run setup to install the application."),
        record("backup:0000", "Backup", "Backups are stored nightly in the archive folder."),
    ];
    SemanticIndex::from_artifact(IndexArtifact::build(&records, None, 2).unwrap()).unwrap()
}

fn options(history_limit: usize) -> SessionOptions {
    SessionOptions { history_limit, min_score: 0.0, ..SessionOptions::default() }
}

fn echo() -> Box<dyn Responder> {
    Box::new(|p: &ChatPrompt| -> Result<String> { Ok(format!("  answer to {}  ", p.question().unwrap_or(""))) })
}

#[test]
fn prompt_contains_system_context_and_user() {
    let mut session = ChatSession::new(index(), echo(), options(4)).unwrap();
    let turn = session.send("  How do I install the application?  ").unwrap();

    let roles: Vec<ChatRole> = turn.prompt.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![ChatRole::System, ChatRole::System, ChatRole::User]);
    assert!(turn.prompt.messages[1].content.starts_with("Context from the knowledge base:\n"));
    assert!(turn.prompt.messages[1].content.contains("[1] Install (section 0)"));
    assert_eq!(turn.prompt.messages[2].content, "How do I install the application?");
    assert_eq!(turn.prompt.context[0].chunk_id, "install:0000");
    assert_eq!(turn.response, "answer to How do I install the application?");
}

#[test]
fn no_context_means_no_context_message() {
    let mut session = ChatSession::new(index(), echo(), options(4)).unwrap();
    let turn = session.send("zebra").unwrap();
    assert!(turn.prompt.context.is_empty());
    assert_eq!(turn.prompt.messages.len(), 2);
}

#[test]
fn history_is_truncated_to_limit_pairs() {
    let mut session = ChatSession::new(index(), echo(), options(2)).unwrap();
    for q in ["one", "two", "three"] {
        session.send(q).unwrap();
    }
    let contents: Vec<&str> = session.history().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["two", "answer to two", "three", "answer to three"]);

    let turn = session.send("four").unwrap();
    assert_eq!(turn.prompt.messages.len(), 1 + 4 + 1);
}

#[test]
fn zero_history_limit_keeps_nothing() {
    let mut session = ChatSession::new(index(), echo(), options(0)).unwrap();
    session.send("install").unwrap();
    assert!(session.history().is_empty());
}

#[test]
fn invalid_input_and_config() {
    assert!(matches!(
        ChatSession::new(index(), echo(), SessionOptions { top_k: 0, ..SessionOptions::default() }),
        Err(Error::InvalidConfig(_))
    ));
    let mut session = ChatSession::new(index(), echo(), options(4)).unwrap();
    assert!(matches!(session.send("   "), Err(Error::InvalidInput(_))));
}

#[test]
fn responder_failure_leaves_history_untouched() {
    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    let flaky = move |_: &ChatPrompt| -> Result<String> {
        let mut n = counter.lock().unwrap();
        *n += 1;
        if *n == 2 { Err(Error::Responder("down".into())) } else { Ok("ok".into()) }
    };
    let mut session = ChatSession::new(index(), Box::new(flaky), options(4))
        .unwrap()
        .with_transcript(ChatTranscript::new());
    session.send("install").unwrap();
    assert!(matches!(session.send("backup"), Err(Error::Responder(_))));
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.transcript().map(ChatTranscript::len), Some(1));
}

#[test]
fn transcript_records_each_turn() {
    let mut session = ChatSession::new(index(), Box::new(ContextResponder), options(4))
        .unwrap()
        .with_transcript(ChatTranscript::new());
    session.send("install setup").unwrap();
    session.send("archive backups").unwrap();

    let transcript = session.take_transcript().unwrap();
    assert_eq!(transcript.len(), 2);
    let first = &transcript.turns()[0];
    assert_eq!(first.question, "install setup");
    assert!(first.response.starts_with("Based on the knowledge base"));
    assert_eq!(first.context[0].chunk_id, "install:0000");
    assert_eq!(first.prompt.last().map(|m| m.role), Some(ChatRole::User));

    let stats = transcript.stats();
    assert_eq!(stats.turns, 2);
    assert_eq!(stats.unique_sources, 2);
}
