use std::collections::{BTreeMap, HashMap};

use docrag_core::error::{Error, Result};
use docrag_core::tokenizer::tokenize;
use docrag_core::types::round6;

/// Sparse TF-IDF vector, entries sorted by ascending feature id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    pub fn from_entries<I: IntoIterator<Item = (usize, f64)>>(entries: I) -> Self {
        let sorted: BTreeMap<usize, f64> = entries.into_iter().collect();
        Self { entries: sorted.into_iter().collect() }
    }

    pub fn entries(&self) -> &[(usize, f64)] { &self.entries }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }

    /// Entries with weights rounded for persistence.
    pub fn rounded(&self) -> Vec<(usize, f64)> {
        self.entries.iter().map(|&(i, w)| (i, round6(w))).collect()
    }

    /// Dot product against another id-sorted pair list.
    pub fn dot(&self, other: &[(usize, f64)]) -> f64 {
        let (mut a, mut b) = (0, 0);
        let mut sum = 0.0;
        while a < self.entries.len() && b < other.len() {
            let (ia, wa) = self.entries[a];
            let (ib, wb) = other[b];
            match ia.cmp(&ib) {
                std::cmp::Ordering::Less => a += 1,
                std::cmp::Ordering::Greater => b += 1,
                std::cmp::Ordering::Equal => {
                    sum += wa * wb;
                    a += 1;
                    b += 1;
                }
            }
        }
        sum
    }
}

/// Rejects an IDF table that does not line up with its vocabulary.
pub fn check_schema(vocabulary: &[String], idf: &[f64]) -> Result<()> {
    if vocabulary.len() != idf.len() {
        return Err(Error::InvalidFormat(format!(
            "idf has {} entries but the vocabulary has {} terms",
            idf.len(),
            vocabulary.len()
        )));
    }
    let mut seen = std::collections::HashSet::with_capacity(vocabulary.len());
    if let Some(dup) = vocabulary.iter().find(|t| !seen.insert(t.as_str())) {
        return Err(Error::InvalidFormat(format!("duplicate vocabulary term '{dup}'")));
    }
    Ok(())
}

/// Maps tokens onto feature ids and weights them by term frequency and IDF.
#[derive(Debug, Clone)]
pub struct Vectorizer {
    term_to_id: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl Vectorizer {
    pub fn new(vocabulary: &[String], idf: Vec<f64>) -> Result<Self> {
        check_schema(vocabulary, &idf)?;
        let term_to_id = vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        Ok(Self { term_to_id, idf })
    }

    pub fn feature_id(&self, term: &str) -> Option<usize> { self.term_to_id.get(term).copied() }

    pub fn idf(&self) -> &[f64] { &self.idf }

    pub fn len(&self) -> usize { self.idf.len() }

    pub fn is_empty(&self) -> bool { self.idf.is_empty() }

    pub fn vectorize(&self, text: &str) -> SparseVector {
        self.vectorize_tokens(&tokenize(text))
    }

    /// `tf = count / matched` where `matched` counts only vocabulary tokens.
    pub fn vectorize_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> SparseVector {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for token in tokens {
            if let Some(id) = self.feature_id(token.as_ref()) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        let total: usize = counts.values().sum();
        if total == 0 {
            return SparseVector::default();
        }
        let entries = counts
            .into_iter()
            .map(|(id, count)| (id, count as f64 / total as f64 * self.idf[id]))
            .collect();
        SparseVector { entries }
    }
}
