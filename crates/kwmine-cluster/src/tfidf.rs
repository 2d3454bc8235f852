//! TF-IDF keyword scoring.
//!
//! Each keyword entry is one document. Scores follow the common smoothed
//! formulation:
//!
//! - tokens: runs of two or more word characters, lowercased
//! - `idf(t) = ln((1 + n) / (1 + df(t))) + 1`
//! - document vector: `count(t) * idf(t)`, L2-normalized
//! - keyword score: sum of its normalized token weights

use std::collections::{BTreeMap, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?u)\b\w\w+\b").unwrap());

/// Split a document into lowercased tokens.
pub fn tokenize(doc: &str) -> Vec<String> {
    TOKEN_PATTERN
        .find_iter(doc)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Fitted TF-IDF model.
#[derive(Debug, Clone, Default)]
pub struct TfIdfVectorizer {
    idf: HashMap<String, f64>,
    doc_count: usize,
}

impl TfIdfVectorizer {
    /// Fit on a corpus; duplicated documents each count toward `n` and `df`.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        let mut doc_frequencies: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            let unique: HashSet<String> = tokenize(doc.as_ref()).into_iter().collect();
            for term in unique {
                *doc_frequencies.entry(term).or_insert(0) += 1;
            }
        }

        let n = documents.len() as f64;
        let idf = doc_frequencies
            .into_iter()
            .map(|(term, df)| (term, ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0))
            .collect();

        Self {
            idf,
            doc_count: documents.len(),
        }
    }

    pub fn doc_count(&self) -> usize {
        self.doc_count
    }

    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.idf.get(term).copied()
    }

    /// L2-normalized token weights of `doc`. Unknown tokens are dropped.
    pub fn transform(&self, doc: &str) -> BTreeMap<String, f64> {
        let mut counts: BTreeMap<String, f64> = BTreeMap::new();
        for token in tokenize(doc) {
            if self.idf.contains_key(&token) {
                *counts.entry(token).or_insert(0.0) += 1.0;
            }
        }

        let mut weights: BTreeMap<String, f64> = counts
            .into_iter()
            .map(|(term, tf)| {
                let idf = self.idf[&term];
                (term, tf * idf)
            })
            .collect();

        let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            weights.values_mut().for_each(|w| *w /= norm);
        }
        weights
    }

    /// Sum of the normalized token weights of `doc`.
    pub fn score(&self, doc: &str) -> f64 {
        self.transform(doc).values().sum()
    }

    /// Scores for every distinct document in `docs`.
    pub fn scores<'a, I>(&self, docs: I) -> HashMap<String, f64>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut scores = HashMap::new();
        for doc in docs {
            if !scores.contains_key(doc) {
                scores.insert(doc.to_string(), self.score(doc));
            }
        }
        scores
    }
}
