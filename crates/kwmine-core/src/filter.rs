//! Token filter turning analyzer output into review keywords.

use std::collections::HashSet;

use tracing::trace;

use crate::defaults::{
    LEMMA_SUFFIX, MIN_KEYWORD_CHARS, TAG_ADJECTIVE_PREFIX, TAG_COMMON_NOUN, TAG_PROPER_NOUN,
    TAG_VERB_PREFIX,
};
use crate::error::Result;
use crate::models::{Morpheme, ReviewKeywords, SkipReason};
use crate::stopwords::Stopwords;
use crate::traits::MorphAnalyzer;

/// Why a token was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Surface form is a stopword.
    StopwordSurface,
    /// Surface form is too short.
    ShortSurface,
    /// Adjective/verb lemma is a stopword.
    StopwordLemma,
    /// Adjective/verb lemma is too short.
    ShortLemma,
    /// Tag is neither noun nor adjective/verb.
    Tag,
}

/// Filter verdict for one morpheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenDecision {
    Accept(String),
    Reject(RejectReason),
}

/// Word class a tag belongs to, as far as keyword extraction cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordClass {
    Noun,
    Predicate,
    Other,
}

fn classify(tag: &str) -> WordClass {
    if tag == TAG_COMMON_NOUN || tag == TAG_PROPER_NOUN {
        WordClass::Noun
    } else if tag.starts_with(TAG_ADJECTIVE_PREFIX) || tag.starts_with(TAG_VERB_PREFIX) {
        WordClass::Predicate
    } else {
        WordClass::Other
    }
}

/// Build a dictionary-form lemma from a predicate stem (`맛있` -> `맛있다`).
pub fn predicate_lemma(stem: &str) -> String {
    if stem.ends_with(LEMMA_SUFFIX) {
        stem.to_string()
    } else {
        format!("{}{}", stem, LEMMA_SUFFIX)
    }
}

/// Stopword and POS filter for review keywords.
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    stopwords: Stopwords,
    min_chars: usize,
}

impl KeywordFilter {
    pub fn new(stopwords: Stopwords) -> Self {
        Self {
            stopwords,
            min_chars: MIN_KEYWORD_CHARS,
        }
    }

    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    pub fn stopwords(&self) -> &Stopwords {
        &self.stopwords
    }

    fn too_short(&self, s: &str) -> bool {
        s.chars().count() < self.min_chars
    }

    /// Decide whether a single morpheme yields a keyword.
    pub fn decide(&self, morpheme: &Morpheme) -> TokenDecision {
        let surface = morpheme.surface.as_str();
        if self.stopwords.contains(surface) {
            return TokenDecision::Reject(RejectReason::StopwordSurface);
        }
        if self.too_short(surface) {
            return TokenDecision::Reject(RejectReason::ShortSurface);
        }

        match classify(&morpheme.tag) {
            WordClass::Noun => TokenDecision::Accept(surface.to_string()),
            WordClass::Predicate => {
                let lemma = morpheme.lemma.as_str();
                if self.stopwords.contains(lemma) {
                    TokenDecision::Reject(RejectReason::StopwordLemma)
                } else if self.too_short(lemma) {
                    TokenDecision::Reject(RejectReason::ShortLemma)
                } else {
                    TokenDecision::Accept(lemma.to_string())
                }
            }
            WordClass::Other => TokenDecision::Reject(RejectReason::Tag),
        }
    }

    /// Distinct accepted keywords from analyzer output, in first-seen order.
    pub fn keywords(&self, morphemes: &[Morpheme]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut keywords = Vec::new();
        for morpheme in morphemes {
            match self.decide(morpheme) {
                TokenDecision::Accept(keyword) => {
                    if seen.insert(keyword.clone()) {
                        keywords.push(keyword);
                    }
                }
                TokenDecision::Reject(reason) => {
                    trace!(
                        surface = %morpheme.surface,
                        tag = %morpheme.tag,
                        ?reason,
                        "Token rejected"
                    );
                }
            }
        }
        keywords
    }

    /// Analyze one review and filter its tokens.
    ///
    /// Blank or missing text is skipped without calling the analyzer; analyzer
    /// errors propagate.
    pub fn extract(&self, analyzer: &dyn MorphAnalyzer, text: Option<&str>) -> Result<ReviewKeywords> {
        let text = match text {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Ok(ReviewKeywords::Skipped(SkipReason::EmptyText)),
        };
        let morphemes = analyzer.analyze(text)?;
        Ok(ReviewKeywords::Extracted(self.keywords(&morphemes)))
    }
}
