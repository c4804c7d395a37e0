use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use docrag_core::error::Result;
use docrag_core::types::round6;

use crate::transcript::{ChatTranscript, TranscriptStats};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub hits: usize,
    pub average_score: f64,
    pub max_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptReport {
    pub stats: TranscriptStats,
    pub sources: Vec<SourceReport>,
}

fn mean(scores: &[f64]) -> f64 { scores.iter().sum::<f64>() / scores.len() as f64 }

/// Group context hits by source; most hits first, then highest mean score.
/// Ties keep first-seen order.
pub fn build_report(transcript: &ChatTranscript) -> TranscriptReport {
    let stats = transcript.stats();
    let mut order: Vec<(String, Vec<f64>)> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    for item in transcript.turns().iter().flat_map(|t| &t.context) {
        let key = item.source_key();
        let slot = *slots.entry(key.clone()).or_insert_with(|| {
            order.push((key, Vec::new()));
            order.len() - 1
        });
        order[slot].1.push(item.score);
    }

    order.sort_by(|a, b| {
        b.1.len()
            .cmp(&a.1.len())
            .then_with(|| mean(&b.1).partial_cmp(&mean(&a.1)).unwrap_or(Ordering::Equal))
    });

    let sources = order
        .into_iter()
        .map(|(source, scores)| SourceReport {
            hits: scores.len(),
            average_score: round6(mean(&scores)),
            max_score: round6(scores.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
            source,
        })
        .collect();
    TranscriptReport { stats, sources }
}

pub fn load_report(path: &Path) -> Result<TranscriptReport> {
    Ok(build_report(&ChatTranscript::load(path)?))
}

pub fn report_from_json(text: &str) -> Result<TranscriptReport> {
    Ok(build_report(&ChatTranscript::from_json(text)?))
}

pub fn format_report(report: &TranscriptReport, top_k: usize) -> String {
    let stats = &report.stats;
    let mut lines = vec![
        "Transcript report:".to_string(),
        format!("- Turns: {}", stats.turns),
        format!("- Context hits: {}", stats.context_items),
        format!("- Average score: {}", stats.average_score),
        format!("- Unique sources: {}", stats.unique_sources),
        String::new(),
    ];
    if report.sources.is_empty() {
        lines.push("No context recorded in the transcript.".to_string());
    } else {
        lines.push("Top sources:".to_string());
        for (position, source) in report.sources.iter().take(top_k).enumerate() {
            lines.push(format!(
                "{}. {} (hits: {}, average score: {}, max: {})",
                position + 1,
                source.source,
                source.hits,
                source.average_score,
                source.max_score
            ));
        }
    }
    lines.join("\n")
}
