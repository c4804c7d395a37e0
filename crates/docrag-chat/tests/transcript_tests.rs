use std::fs;
use tempfile::TempDir;

use docrag_chat::report::{format_report, load_report, report_from_json};
use docrag_chat::transcript::{TranscriptContext, TranscriptTurn};
use docrag_chat::{build_report, ChatMessage, ChatTranscript};
use docrag_core::error::Error;
use docrag_core::types::ChunkMetadata;

fn ctx(id: &str, source: Option<&str>, title: Option<&str>, score: f64) -> TranscriptContext {
    TranscriptContext {
        chunk_id: id.into(),
        score,
        text: format!("text of {id}"),
        metadata: ChunkMetadata {
            source: source.map(Into::into),
            title: title.map(Into::into),
            chunk_index: Some(0),
            word_count: None,
        },
    }
}

fn turn(question: &str, context: Vec<TranscriptContext>) -> TranscriptTurn {
    TranscriptTurn {
        question: question.into(),
        response: format!("re: {question}"),
        context,
        prompt: vec![ChatMessage::system("sys"), ChatMessage::user(question)],
    }
}

fn sample() -> ChatTranscript {
    let mut transcript = ChatTranscript::new();
    transcript.extend([
        turn("q1", vec![ctx("a:0000", Some("a.md"), None, 0.4), ctx("b:0000", None, Some("B"), 0.9)]),
        turn("q2", vec![ctx("a:0001", Some("a.md"), None, 0.6), ctx("c:0000", None, None, 0.3)]),
        turn("q3", vec![]),
    ]);
    transcript
}

#[test]
fn stats_count_hits_and_sources() {
    let stats = sample().stats();
    assert_eq!(stats.turns, 3);
    assert_eq!(stats.context_items, 4);
    assert_eq!(stats.average_score, 0.55);
    assert_eq!(stats.unique_sources, 3);

    let empty = ChatTranscript::new().stats();
    assert_eq!((empty.turns, empty.context_items, empty.average_score), (0, 0, 0.0));
}

#[test]
fn save_and_load_round_trip() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("nested").join("transcript.json");
    let transcript = sample();
    transcript.save(&path, true).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.ends_with("}\n"));
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["stats"]["turns"], 3);
    assert_eq!(value["turns"][0]["prompt"][1]["role"], "user");

    let loaded = ChatTranscript::load(&path).unwrap();
    assert_eq!(loaded, transcript);
}

#[test]
fn stats_can_be_omitted() {
    let value = sample().to_json(false);
    assert!(value.get("stats").is_none());
    assert_eq!(value["turns"].as_array().map(Vec::len), Some(3));
}

#[test]
fn loading_skips_stray_entries() {
    let json = r#"{"turns": [
        42,
        {"question": "q", "response": "r",
         "context": ["x", {"chunk_id": "a:0000", "score": 0.5, "text": "t", "metadata": "bad"}],
         "prompt": [null, {"role": "user", "content": "q"}, {"role": "robot", "content": "?"}]}
    ]}"#;
    let transcript = ChatTranscript::from_json(json).unwrap();
    assert_eq!(transcript.len(), 1);
    let turn = &transcript.turns()[0];
    assert_eq!(turn.context.len(), 1);
    assert_eq!(turn.context[0].metadata, ChunkMetadata::default());
    assert_eq!(turn.prompt, vec![ChatMessage::user("q")]);
}

#[test]
fn malformed_transcripts_are_rejected() {
    for bad in [r#"[]"#, r#"{}"#, r#"{"turns": {}}"#, r#"{"turns": [{"question": "q"}]}"#, "not json"] {
        assert!(matches!(ChatTranscript::from_json(bad), Err(Error::InvalidFormat(_))), "{bad}");
    }
    let tmp = TempDir::new().unwrap();
    assert!(matches!(ChatTranscript::load(&tmp.path().join("none.json")), Err(Error::NotFound(_))));
}

#[test]
fn report_orders_by_hits_then_mean_score() {
    let report = build_report(&sample());
    let order: Vec<(&str, usize)> = report.sources.iter().map(|s| (s.source.as_str(), s.hits)).collect();
    assert_eq!(order, vec![("a.md", 2), ("B", 1), ("c:0000", 1)]);
    assert_eq!(report.sources[0].average_score, 0.5);
    assert_eq!(report.sources[0].max_score, 0.6);
}

#[test]
fn report_ties_keep_first_seen_order() {
    let mut transcript = ChatTranscript::new();
    transcript.extend([turn("q", vec![ctx("x:0000", Some("x.md"), None, 0.5), ctx("y:0000", Some("y.md"), None, 0.5)])]);
    let report = build_report(&transcript);
    assert_eq!(report.sources[0].source, "x.md");
    assert_eq!(report.sources[1].source, "y.md");
}

#[test]
fn formatted_report_lists_top_sources() {
    let text = format_report(&build_report(&sample()), 2);
    assert!(text.starts_with("Transcript report:\n- Turns: 3\n- Context hits: 4"));
    assert!(text.contains("1. a.md (hits: 2, average score: 0.5, max: 0.6)"));
    assert!(text.contains("2. B"));
    assert!(!text.contains("3. c:0000"));

    let empty = format_report(&build_report(&ChatTranscript::new()), 5);
    assert!(empty.ends_with("No context recorded in the transcript."));
}

#[test]
fn report_from_saved_file_and_text() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("t.json");
    sample().save(&path, false).unwrap();
    let from_file = load_report(&path).unwrap();
    let from_text = report_from_json(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(from_file, from_text);
    assert_eq!(from_file.stats.turns, 3);
}
