use std::collections::{HashMap, HashSet};

use docrag_core::error::{Error, Result};
use docrag_core::types::round6;

/// Ordered vocabulary: descending total count, then ascending term, truncated
/// to `max_features`. Terms shorter than `min_term_length` characters are dropped.
pub fn build_vocabulary(
    tokenised: &[Vec<String>],
    max_features: Option<usize>,
    min_term_length: usize,
) -> Result<Vec<String>> {
    if tokenised.is_empty() {
        return Err(Error::EmptyCorpus);
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in tokenised.iter().flatten() {
        if token.chars().count() >= min_term_length {
            *counts.entry(token.as_str()).or_insert(0) += 1;
        }
    }
    if counts.is_empty() {
        return Err(Error::NoVocabulary);
    }

    let mut terms: Vec<(&str, usize)> = counts.into_iter().collect();
    terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    if let Some(limit) = max_features {
        terms.truncate(limit);
    }
    if terms.is_empty() {
        return Err(Error::NoVocabulary);
    }
    Ok(terms.into_iter().map(|(t, _)| t.to_string()).collect())
}

/// Smoothed IDF per vocabulary term: `ln((1 + N) / (1 + df)) + 1`, 6 decimals.
pub fn compute_idf(tokenised: &[Vec<String>], vocabulary: &[String]) -> Vec<f64> {
    let known: HashSet<&str> = vocabulary.iter().map(String::as_str).collect();
    let mut doc_freq: HashMap<&str, usize> = HashMap::new();
    for tokens in tokenised {
        let unique: HashSet<&str> = tokens
            .iter()
            .map(String::as_str)
            .filter(|t| known.contains(t))
            .collect();
        for term in unique {
            *doc_freq.entry(term).or_insert(0) += 1;
        }
    }

    let total = tokenised.len() as f64;
    vocabulary
        .iter()
        .map(|term| {
            let df = doc_freq.get(term.as_str()).copied().unwrap_or(0) as f64;
            round6(((1.0 + total) / (1.0 + df)).ln() + 1.0)
        })
        .collect()
}
