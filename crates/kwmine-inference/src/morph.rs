//! Korean morphological analyzer backed by lindera and mecab-ko-dic.

use lindera::dictionary::{load_embedded_dictionary, DictionaryKind};
use lindera::mode::Mode;
use lindera::segmenter::Segmenter;
use lindera::tokenizer::Tokenizer;
use tracing::{info, trace};

use kwmine_core::defaults::{TAG_ADJECTIVE_PREFIX, TAG_VERB_PREFIX};
use kwmine_core::{predicate_lemma, Error, MorphAnalyzer, Morpheme, Result};

/// ko-dic detail columns.
const DETAIL_POS: usize = 0;
const DETAIL_TYPE: usize = 4;
const DETAIL_EXPRESSION: usize = 7;

/// Entry types whose expression lists the component morphemes
/// (`커요` = `크/VA/*+어요/EF/*`).
const SPLIT_TYPES: [&str; 2] = ["Inflect", "Preanalysis"];

/// Tag lindera reports for out-of-vocabulary text.
const TAG_UNKNOWN: &str = "UNK";

/// Analyzer using the ko-dic dictionary compiled into the binary.
pub struct LinderaAnalyzer {
    tokenizer: Tokenizer,
}

impl LinderaAnalyzer {
    /// Load the embedded ko-dic dictionary.
    pub fn new() -> Result<Self> {
        let dictionary = load_embedded_dictionary(DictionaryKind::KoDic)
            .map_err(|e| Error::Analysis(format!("Failed to load ko-dic: {}", e)))?;
        let segmenter = Segmenter::new(Mode::Normal, dictionary, None);
        info!(
            subsystem = "inference",
            component = "lindera",
            "Loaded embedded ko-dic dictionary"
        );
        Ok(Self {
            tokenizer: Tokenizer::new(segmenter),
        })
    }
}

fn is_predicate(tag: &str) -> bool {
    tag.starts_with(TAG_ADJECTIVE_PREFIX) || tag.starts_with(TAG_VERB_PREFIX)
}

fn morpheme(surface: &str, tag: &str) -> Morpheme {
    let lemma = if is_predicate(tag) {
        predicate_lemma(surface)
    } else {
        surface.to_string()
    };
    Morpheme::new(surface, lemma, tag)
}

/// Components of an expression field (`크/VA/*+어요/EF/*`).
///
/// `None` when any component lacks a form or tag.
fn split_expression(expression: &str) -> Option<Vec<Morpheme>> {
    expression
        .split('+')
        .map(|component| {
            let mut fields = component.split('/');
            let form = fields.next().filter(|f| !f.is_empty() && *f != "*")?;
            let tag = fields.next().filter(|t| !t.is_empty() && *t != "*")?;
            Some(morpheme(form, tag))
        })
        .collect()
}

/// Morphemes of one token given its ko-dic details.
///
/// Inflected and pre-analyzed entries fuse several morphemes into one
/// surface; those are split so each stem carries its own form and tag.
fn to_morphemes(surface: &str, details: &[&str]) -> Vec<Morpheme> {
    let splittable = details
        .get(DETAIL_TYPE)
        .is_some_and(|t| SPLIT_TYPES.contains(t));
    if splittable {
        if let Some(parts) = details
            .get(DETAIL_EXPRESSION)
            .and_then(|e| split_expression(e))
            .filter(|parts| !parts.is_empty())
        {
            return parts;
        }
    }

    let tag = details
        .get(DETAIL_POS)
        .copied()
        .filter(|t| !t.is_empty() && *t != "*")
        .unwrap_or(TAG_UNKNOWN);
    vec![morpheme(surface, tag)]
}

impl MorphAnalyzer for LinderaAnalyzer {
    fn analyze(&self, text: &str) -> Result<Vec<Morpheme>> {
        let tokens = self
            .tokenizer
            .tokenize(text)
            .map_err(|e| Error::Analysis(format!("Tokenization failed: {}", e)))?;

        let mut morphemes = Vec::with_capacity(tokens.len());
        for mut token in tokens {
            let surface = token.surface.to_string();
            let details = token.details();
            for morpheme in to_morphemes(&surface, &details) {
                trace!(token = %surface, surface = %morpheme.surface, tag = %morpheme.tag, lemma = %morpheme.lemma, "Morpheme");
                morphemes.push(morpheme);
            }
        }
        Ok(morphemes)
    }

    fn name(&self) -> &str {
        "lindera-ko-dic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kwmine_core::{KeywordFilter, Stopwords, TokenDecision};

    fn filter() -> KeywordFilter {
        KeywordFilter::new(Stopwords::default())
    }

    #[test]
    fn test_noun_lemma_is_surface() {
        let details = ["NNG", "*", "F", "커피", "*", "*", "*", "*"];
        assert_eq!(
            to_morphemes("커피", &details),
            vec![Morpheme::new("커피", "커피", "NNG")]
        );
    }

    #[test]
    fn test_plain_predicate_gets_suffix() {
        let details = ["VA", "*", "T", "맛있", "*", "*", "*", "*"];
        let m = to_morphemes("맛있", &details);
        assert_eq!(m, vec![Morpheme::new("맛있", "맛있다", "VA")]);
    }

    #[test]
    fn test_inflected_predicate_splits_into_components() {
        let details = [
            "VA+EP",
            "*",
            "T",
            "맛있었",
            "Inflect",
            "VA",
            "EP",
            "맛있/VA/*+었/EP/*",
        ];
        let m = to_morphemes("맛있었", &details);
        assert_eq!(
            m,
            vec![
                Morpheme::new("맛있", "맛있다", "VA"),
                Morpheme::new("었", "었", "EP"),
            ]
        );
    }

    #[test]
    fn test_one_syllable_stem_is_rejected_by_length() {
        let details = [
            "VA+EF",
            "*",
            "F",
            "커요",
            "Inflect",
            "VA",
            "EF",
            "크/VA/*+어요/EF/*",
        ];
        let m = to_morphemes("커요", &details);
        assert_eq!(m[0], Morpheme::new("크", "크다", "VA"));
        assert_eq!(m[1].tag, "EF");

        let f = filter();
        assert!(m
            .iter()
            .all(|m| !matches!(f.decide(m), TokenDecision::Accept(_))));
    }

    #[test]
    fn test_preanalyzed_noun_compound_keeps_the_noun() {
        let details = [
            "NNG+JKS",
            "*",
            "F",
            "분위기가",
            "Preanalysis",
            "NNG",
            "JKS",
            "분위기/NNG/*+가/JKS/*",
        ];
        let m = to_morphemes("분위기가", &details);
        assert_eq!(m[0], Morpheme::new("분위기", "분위기", "NNG"));
        assert_eq!(
            filter().decide(&m[0]),
            TokenDecision::Accept("분위기".to_string())
        );
    }

    #[test]
    fn test_malformed_expression_falls_back_to_token() {
        let details = ["VV+EP", "*", "T", "갔", "Inflect", "VV", "EP", "*"];
        assert_eq!(
            to_morphemes("갔", &details),
            vec![Morpheme::new("갔", "갔다", "VV+EP")]
        );
    }

    #[test]
    fn test_compound_entry_is_not_split() {
        let details = [
            "NNG",
            "*",
            "T",
            "커피숍",
            "Compound",
            "*",
            "*",
            "커피/NNG/*+숍/NNG/*",
        ];
        assert_eq!(
            to_morphemes("커피숍", &details),
            vec![Morpheme::new("커피숍", "커피숍", "NNG")]
        );
    }

    #[test]
    fn test_unknown_tag() {
        let m = to_morphemes("ㅋㅋㅋ", &["*"]);
        assert_eq!(m, vec![Morpheme::new("ㅋㅋㅋ", "ㅋㅋㅋ", TAG_UNKNOWN)]);
        assert_eq!(to_morphemes("zz", &[])[0].tag, TAG_UNKNOWN);
    }

    #[test]
    #[ignore = "loads the embedded dictionary; slow"]
    fn test_analyze_review_sentence() {
        let analyzer = LinderaAnalyzer::new().unwrap();
        let morphemes = analyzer.analyze("커피가 정말 맛있었어요").unwrap();
        assert!(morphemes.iter().any(|m| m.surface == "커피" && m.tag == "NNG"));
        assert!(morphemes.iter().any(|m| m.lemma == "맛있다"));
    }
}
