use std::fs;
use std::path::Path;
use tempfile::TempDir;

use docrag_core::error::Error;
use docrag_core::types::ChunkRecord;
use docrag_index::vocabulary::build_vocabulary;
use docrag_index::{build_index, IndexArtifact, IndexOptions, SemanticIndex};

fn record(id: &str, title: &str, text: &str) -> ChunkRecord {
    ChunkRecord {
        id: id.to_string(),
        source: format!("docs/{title}.md"),
        title: title.to_string(),
        chunk_index: 0,
        word_count: text.split_whitespace().count(),
        text: text.to_string(),
    }
}

fn write_corpus(path: &Path, records: &[ChunkRecord]) {
    let lines: Vec<String> = records.iter().map(|r| serde_json::to_string(r).unwrap()).collect();
    fs::write(path, lines.join("\n") + "\n").unwrap();
}

fn german_corpus() -> Vec<ChunkRecord> {
    vec![
        record("python:0000", "python", "Python ist eine beliebte Programmiersprache für Datenanalyse."),
        record("php:0000", "php", "PHP ist weit verbreitet im Web und betreibt viele Webseiten."),
    ]
}

fn mixed_corpus() -> Vec<ChunkRecord> {
    vec![
        record("a:0000", "a", "rust ownership borrowing lifetimes rust"),
        record("b:0000", "b", "rust cargo crates registry"),
        record("c:0000", "c", "python packaging wheels registry"),
        record("d:0000", "d", "gardening tomatoes soil compost"),
    ]
}

#[test]
fn python_chunk_ranks_first_for_python_question() {
    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("corpus.jsonl");
    let index_path = tmp.path().join("out").join("index.json");
    write_corpus(&corpus, &german_corpus());

    let summary = build_index(&IndexOptions::new(&corpus, &index_path)).expect("build");
    assert_eq!(summary.chunks, 2);
    assert!(summary.vocabulary_size > 0);

    let index = SemanticIndex::load(&index_path).expect("load");
    let results = index.search("Wie kann ich mit Python Daten analysieren?", 2, 0.0).unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].chunk_id, "python:0000");
    assert_eq!(results[0].metadata.title.as_deref(), Some("python"));
    assert!(results[0].text.starts_with("Python ist"));
}

#[test]
fn exact_chunk_text_scores_close_to_one() {
    let artifact = IndexArtifact::build(&mixed_corpus(), None, 2).unwrap();
    let index = SemanticIndex::from_artifact(artifact).unwrap();
    let results = index.search("rust cargo crates registry", 3, 0.0).unwrap();
    assert_eq!(results[0].chunk_id, "b:0000");
    assert!((results[0].score - 1.0).abs() < 1e-5, "{}", results[0].score);
}

#[test]
fn empty_corpus_file_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let corpus = tmp.path().join("corpus.jsonl");
    fs::write(&corpus, "").unwrap();
    let err = build_index(&IndexOptions::new(&corpus, tmp.path().join("index.json"))).unwrap_err();
    assert!(matches!(err, Error::EmptyCorpus), "{err:?}");
    assert!(!tmp.path().join("index.json").exists());
}

#[test]
fn missing_corpus_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let err = build_index(&IndexOptions::new(tmp.path().join("nope.jsonl"), tmp.path().join("i.json")))
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn corpus_of_short_tokens_has_no_vocabulary() {
    let records = vec![record("x:0000", "x", "a b c 1 2")];
    assert!(matches!(IndexArtifact::build(&records, None, 2), Err(Error::NoVocabulary)));
}

#[test]
fn save_then_load_round_trips() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("index.json");
    let artifact = IndexArtifact::build(&mixed_corpus(), Some(8), 2).unwrap();
    artifact.save(&path).unwrap();

    let loaded = IndexArtifact::load(&path).unwrap();
    assert_eq!(loaded.vocabulary, artifact.vocabulary);
    assert_eq!(loaded.vocabulary.len(), 8);
    let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
    assert!(loaded.idf.iter().zip(&artifact.idf).all(|(a, b)| close(*a, *b)));
    assert_eq!(loaded.chunks.len(), artifact.chunks.len());
    for (got, want) in loaded.chunks.iter().zip(&artifact.chunks) {
        assert_eq!(got.id, want.id);
        assert_eq!(got.metadata, want.metadata);
        assert!(close(got.norm, want.norm));
        let ids = |c: &docrag_index::IndexedChunk| c.vector.iter().map(|p| p.0).collect::<Vec<_>>();
        assert_eq!(ids(got), ids(want));
        assert!(got.vector.iter().zip(&want.vector).all(|(a, b)| close(a.1, b.1)));
    }

    let leftovers: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
    assert_eq!(leftovers.len(), 1, "temp file left behind");
}

#[test]
fn stored_norm_matches_stored_weights() {
    let artifact = IndexArtifact::build(&mixed_corpus(), None, 2).unwrap();
    for chunk in &artifact.chunks {
        let expected = chunk.vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        assert!((chunk.norm - expected).abs() < 1e-5, "{}: {} vs {expected}", chunk.id, chunk.norm);
        assert!(chunk.vector.windows(2).all(|p| p[0].0 < p[1].0));
    }
}

#[test]
fn idf_is_positive_and_lower_for_common_terms() {
    let records = vec![
        record("a:0000", "a", "shared alpha"),
        record("b:0000", "b", "shared beta"),
        record("c:0000", "c", "shared gamma"),
    ];
    let artifact = IndexArtifact::build(&records, None, 2).unwrap();
    assert!(artifact.idf.iter().all(|w| *w > 0.0));
    let pos = |t: &str| artifact.vocabulary.iter().position(|v| v == t).unwrap();
    assert!(artifact.idf[pos("shared")] < artifact.idf[pos("alpha")]);
}

#[test]
fn vocabulary_is_deterministic() {
    let tokens: Vec<Vec<String>> = mixed_corpus()
        .iter()
        .map(|r| docrag_core::tokenizer::tokenize(&r.text))
        .collect();
    let first = build_vocabulary(&tokens, None, 2).unwrap();
    let second = build_vocabulary(&tokens, None, 2).unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0], "rust");
    assert_eq!(first[1], "registry");
}

#[test]
fn results_respect_top_k_and_min_score() {
    let index = SemanticIndex::from_artifact(IndexArtifact::build(&mixed_corpus(), None, 2).unwrap()).unwrap();
    for query in ["rust registry", "python wheels", "compost rust", "registry"] {
        for (top_k, min_score) in [(1, 0.0), (2, 0.1), (4, 0.3), (10, 0.9)] {
            let results = index.search(query, top_k, min_score).unwrap();
            assert!(results.len() <= top_k);
            assert!(results.iter().all(|r| r.score >= min_score), "{query}: {results:?}");
            assert!(results.windows(2).all(|p| p[0].score >= p[1].score));
        }
    }
}

#[test]
fn unknown_query_and_zero_top_k() {
    let index = SemanticIndex::from_artifact(IndexArtifact::build(&mixed_corpus(), None, 2).unwrap()).unwrap();
    assert!(index.search("völlig unbekannt", 3, 0.0).unwrap().is_empty());
    assert!(index.search("", 3, 0.0).unwrap().is_empty());
    assert!(matches!(index.search("rust", 0, 0.0), Err(Error::InvalidConfig(_))));
}

#[test]
fn results_are_copies_of_index_data() {
    let index = SemanticIndex::from_artifact(IndexArtifact::build(&mixed_corpus(), None, 2).unwrap()).unwrap();
    let mut results = index.search("gardening", 1, 0.0).unwrap();
    results[0].metadata.title = Some("changed".into());
    results[0].text.clear();
    let again = index.search("gardening", 1, 0.0).unwrap();
    assert_eq!(again[0].metadata.title.as_deref(), Some("d"));
    assert!(!again[0].text.is_empty());
}

#[test]
fn malformed_pairs_are_skipped_on_load() {
    let json = r#"{
        "vocabulary": ["alpha", "beta"],
        "idf": [1.0, 1.5],
        "chunks": [{
            "id": "x:0000",
            "text": "alpha beta",
            "metadata": {"title": "x"},
            "vector": [[0, 0.5], "bad", [1], [7, 1.0], ["beta", 1.0], [1, "w"], [0, 0.7], [1.0, 0.2]],
            "norm": 0.73
        }, {
            "id": "y:0000",
            "text": "no norm"
        }]
    }"#;
    let artifact = IndexArtifact::from_json(json).unwrap();
    assert_eq!(artifact.chunks[0].vector, vec![(0, 0.7), (1, 0.2)]);
    assert_eq!(artifact.chunks[1].norm, 0.0);
    assert!(artifact.chunks[1].vector.is_empty());

    let index = SemanticIndex::from_artifact(artifact).unwrap();
    let results = index.search("alpha", 5, 0.0).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk_id, "x:0000");
}

#[test]
fn non_string_chunk_ids_are_stringified() {
    let json = r#"{
        "vocabulary": ["alpha"],
        "idf": [1.0],
        "chunks": [
            {"id": 17, "text": "alpha", "vector": [[0, 1.0]], "norm": 1.0},
            {"id": null, "text": 3.5, "vector": [[0, 0.5]], "norm": 0.5}
        ]
    }"#;
    let artifact = IndexArtifact::from_json(json).unwrap();
    assert_eq!(artifact.chunks[0].id, "17");
    assert_eq!(artifact.chunks[1].id, "");
    assert_eq!(artifact.chunks[1].text, "3.5");

    let index = SemanticIndex::from_artifact(artifact).unwrap();
    let results = index.search("alpha", 5, 0.0).unwrap();
    assert_eq!(results[0].chunk_id, "17");
}

#[test]
fn artifact_shape_errors_are_invalid_format() {
    assert!(matches!(IndexArtifact::from_json("[1, 2]"), Err(Error::InvalidFormat(_))));
    assert!(matches!(IndexArtifact::from_json("{not json"), Err(Error::InvalidFormat(_))));
    assert!(matches!(
        IndexArtifact::from_json(r#"{"vocabulary": ["a", "b"], "idf": [1.0]}"#),
        Err(Error::InvalidFormat(_))
    ));
    assert!(matches!(
        IndexArtifact::from_json(r#"{"vocabulary": ["a", "a"], "idf": [1.0, 1.0]}"#),
        Err(Error::InvalidFormat(_))
    ));
    assert!(matches!(IndexArtifact::from_json(r#"{"chunks": 3}"#), Err(Error::InvalidFormat(_))));

    let empty = IndexArtifact::from_json("{}").unwrap();
    assert!(empty.vocabulary.is_empty() && empty.chunks.is_empty());
}

#[test]
fn missing_artifact_is_not_found() {
    let tmp = TempDir::new().unwrap();
    assert!(matches!(SemanticIndex::load(&tmp.path().join("index.json")), Err(Error::NotFound(_))));
}
