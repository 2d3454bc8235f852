//! Stopword configuration.
//!
//! Stopwords are grouped by category in YAML (`category: [term, ...]`). The
//! built-in list is compiled in from `resources/stopwords.yaml`; deployments
//! can point `KWMINE_STOPWORDS_PATH` at their own file.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable naming a replacement stopword file.
pub const STOPWORDS_PATH_ENV: &str = "KWMINE_STOPWORDS_PATH";

const BUILTIN_STOPWORDS: &str = include_str!("../resources/stopwords.yaml");

/// Trimmed, non-blank terms.
fn normalize_terms<'a>(terms: impl Iterator<Item = &'a str> + 'a) -> impl Iterator<Item = String> + 'a {
    terms
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
}

/// Immutable stopword set.
#[derive(Debug, Clone, Default)]
pub struct Stopwords {
    categories: BTreeMap<String, Vec<String>>,
    words: HashSet<String>,
}

impl Stopwords {
    /// The compiled-in stopword list.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_STOPWORDS)
    }

    /// Parse a `category: [term, ...]` YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let categories: BTreeMap<String, Vec<String>> = serde_yaml::from_str(yaml)?;
        let words = normalize_terms(categories.values().flatten().map(String::as_str)).collect();
        Ok(Self { categories, words })
    }

    /// Load a stopword file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read stopwords {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&yaml)
    }

    /// `KWMINE_STOPWORDS_PATH` if set, otherwise the built-in list.
    pub fn from_env() -> Result<Self> {
        let stopwords = match std::env::var(STOPWORDS_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_path(path.trim())?,
            _ => Self::builtin()?,
        };
        debug!(
            subsystem = "core",
            component = "stopwords",
            categories = stopwords.categories.len(),
            words = stopwords.len(),
            "Loaded stopwords"
        );
        Ok(stopwords)
    }

    /// Add terms outside any category.
    pub fn with_extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let extra: Vec<String> = extra.into_iter().map(Into::into).collect();
        self.words
            .extend(normalize_terms(extra.iter().map(String::as_str)));
        self
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Terms of a single category, as listed in the source file.
    pub fn category(&self, name: &str) -> Option<&[String]> {
        self.categories.get(name).map(Vec::as_slice)
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }
}
