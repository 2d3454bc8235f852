//! Domain models for the keyword pipeline.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::defaults::NOISE_LABEL;

/// Identifier of a place (the external directory's numeric id).
pub type PlaceId = i64;

/// Dense embedding vector.
pub type Embedding = Vec<f32>;

// =============================================================================
// INPUT
// =============================================================================

/// A review row as produced by the scraping layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReview {
    pub place_id: PlaceId,
    /// Review body. `None` or blank text contributes no keywords.
    pub text: Option<String>,
    pub rating: Option<f32>,
}

impl RawReview {
    pub fn new(place_id: PlaceId, text: impl Into<String>) -> Self {
        Self {
            place_id,
            text: Some(text.into()),
            rating: None,
        }
    }

    /// Review text if it has any non-whitespace content.
    pub fn content(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// One unit of morphological analysis output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Morpheme {
    /// Form as it appears in the text.
    pub surface: String,
    /// Dictionary base form.
    pub lemma: String,
    /// Part-of-speech tag (Sejong tag set, e.g. `NNG`, `VV`, `VA+EP`).
    pub tag: String,
}

impl Morpheme {
    pub fn new(surface: impl Into<String>, lemma: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            surface: surface.into(),
            lemma: lemma.into(),
            tag: tag.into(),
        }
    }
}

// =============================================================================
// EXTRACTION
// =============================================================================

/// Why an item produced no output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SkipReason {
    /// Review text was null or blank.
    EmptyText,
    /// Place had too few keyword entries to cluster.
    InsufficientKeywords { count: usize },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "empty_text"),
            Self::InsufficientKeywords { count } => write!(f, "insufficient_keywords({})", count),
        }
    }
}

/// Keywords extracted from a single review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewKeywords {
    /// Distinct accepted keywords in first-seen order.
    Extracted(Vec<String>),
    Skipped(SkipReason),
}

impl ReviewKeywords {
    pub fn keywords(&self) -> &[String] {
        match self {
            Self::Extracted(k) => k,
            Self::Skipped(_) => &[],
        }
    }
}

/// Per-place keyword counter; one increment per review containing a keyword.
///
/// Keeps first-seen order so row ids are assigned deterministically.
#[derive(Debug, Clone, Default)]
pub struct KeywordTally {
    order: Vec<String>,
    counts: std::collections::HashMap<String, i64>,
}

impl KeywordTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one review's keywords. Duplicates within `keywords` count once.
    pub fn add_review(&mut self, keywords: &[String]) {
        let mut seen = HashSet::with_capacity(keywords.len());
        for keyword in keywords {
            if !seen.insert(keyword.as_str()) {
                continue;
            }
            match self.counts.get_mut(keyword) {
                Some(count) => *count += 1,
                None => {
                    self.order.push(keyword.clone());
                    self.counts.insert(keyword.clone(), 1);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn count(&self, keyword: &str) -> i64 {
        self.counts.get(keyword).copied().unwrap_or(0)
    }

    /// Counts in first-seen order.
    pub fn into_counts(self, place_id: PlaceId) -> Vec<KeywordCount> {
        let Self { order, counts } = self;
        order
            .into_iter()
            .map(|keyword| {
                let count = counts[&keyword];
                KeywordCount {
                    place_id,
                    keyword,
                    count,
                }
            })
            .collect()
    }
}

/// Stored number of reviews of a place that mention a keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub place_id: PlaceId,
    pub keyword: String,
    pub count: i64,
}

// =============================================================================
// CLUSTERING
// =============================================================================

/// Keyword list of a place used as clustering input.
///
/// Each stored keyword appears once per review that mentioned it, so frequent
/// keywords weigh more in the cluster geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceKeywordSet {
    pub place_id: PlaceId,
    pub keywords: Vec<String>,
}

impl PlaceKeywordSet {
    pub fn new(place_id: PlaceId, keywords: Vec<String>) -> Self {
        Self { place_id, keywords }
    }

    /// Expand stored counts (already in row order) into the occurrence list.
    pub fn from_counts(place_id: PlaceId, counts: &[KeywordCount]) -> Self {
        let keywords = counts
            .iter()
            .filter(|c| c.place_id == place_id)
            .flat_map(|c| std::iter::repeat(c.keyword.clone()).take(c.count.max(0) as usize))
            .collect();
        Self { place_id, keywords }
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Distinct keywords in first-occurrence order.
    pub fn distinct(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.keywords
            .iter()
            .filter(|k| seen.insert(k.as_str()))
            .cloned()
            .collect()
    }
}

/// Cluster membership of one keyword occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClusterLabel {
    Cluster(i32),
    Noise,
}

impl ClusterLabel {
    /// Interpret a raw clusterer label (negative means noise).
    pub fn from_raw(label: i32) -> Self {
        if label < 0 {
            Self::Noise
        } else {
            Self::Cluster(label)
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            Self::Cluster(id) => id,
            Self::Noise => NOISE_LABEL,
        }
    }

    pub fn is_noise(self) -> bool {
        matches!(self, Self::Noise)
    }
}

/// A keyword occurrence with its cluster label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAssignment {
    pub place_id: PlaceId,
    pub label: ClusterLabel,
    pub keyword: String,
}

/// Persisted (cluster, keyword) membership count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteredKeywordRow {
    pub place_id: PlaceId,
    pub cluster_id: i32,
    pub keyword: String,
    pub count: i64,
}

/// Persisted per-cluster summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub place_id: PlaceId,
    pub cluster_id: i32,
    pub representative_keyword: String,
    pub keyword_count: i64,
}

/// Everything written for one clustered place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceClusters {
    pub rows: Vec<ClusteredKeywordRow>,
    pub summaries: Vec<ClusterSummary>,
    /// Occurrences labelled noise (not persisted).
    pub noise: usize,
}

impl PlaceClusters {
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    /// Keywords belonging to `cluster_id`.
    pub fn members(&self, cluster_id: i32) -> BTreeSet<&str> {
        self.rows
            .iter()
            .filter(|r| r.cluster_id == cluster_id)
            .map(|r| r.keyword.as_str())
            .collect()
    }
}

/// Result of clustering one place.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceOutcome {
    Clustered(PlaceClusters),
    Skipped(SkipReason),
    /// Place-level failure; the run continues with the next place.
    Failed(String),
}

// =============================================================================
// REPORTS
// =============================================================================

/// Counters from the extraction stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub places: usize,
    pub reviews_analyzed: usize,
    pub reviews_skipped: usize,
    pub keyword_rows: usize,
}

/// Counters from the clustering stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteringReport {
    pub places_total: usize,
    pub places_clustered: usize,
    pub places_skipped: usize,
    pub places_failed: usize,
    pub clusters_written: usize,
    pub keyword_rows_written: usize,
}

/// Final result record of a full pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub extraction: ExtractionReport,
    pub clustering: ClusteringReport,
}

// =============================================================================
// JOBS
// =============================================================================

/// Status of a keyword pipeline job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

/// Which stages a job runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Extraction followed by clustering.
    #[default]
    ExtractAndCluster,
    ExtractOnly,
    ClusterOnly,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExtractAndCluster => "extract_and_cluster",
            Self::ExtractOnly => "extract_only",
            Self::ClusterOnly => "cluster_only",
        }
    }
}

impl std::str::FromStr for JobKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "extract_and_cluster" => Ok(Self::ExtractAndCluster),
            "extract_only" => Ok(Self::ExtractOnly),
            "cluster_only" => Ok(Self::ClusterOnly),
            _ => Err(format!("Invalid job kind: {}", s)),
        }
    }
}

/// Status record of a keyword pipeline job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordJob {
    pub id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    pub progress_percent: i32,
    pub progress_stage: Option<String>,
    pub result: Option<JsonValue>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(place_id: PlaceId, keyword: &str, count: i64) -> KeywordCount {
        KeywordCount {
            place_id,
            keyword: keyword.to_string(),
            count,
        }
    }

    #[test]
    fn test_raw_review_content_blank() {
        let mut review = RawReview::new(1, "   ");
        assert!(review.content().is_none());
        review.text = None;
        assert!(review.content().is_none());
        review.text = Some("커피 맛집".into());
        assert_eq!(review.content(), Some("커피 맛집"));
    }

    #[test]
    fn test_keyword_tally_counts_once_per_review() {
        let mut tally = KeywordTally::new();
        tally.add_review(&["커피".into(), "커피".into(), "분위기".into()]);
        tally.add_review(&["커피".into()]);

        assert_eq!(tally.count("커피"), 2);
        assert_eq!(tally.count("분위기"), 1);
        assert_eq!(tally.count("디저트"), 0);

        let counts = tally.into_counts(7);
        assert_eq!(counts, vec![count(7, "커피", 2), count(7, "분위기", 1)]);
    }

    #[test]
    fn test_keyword_tally_empty() {
        let tally = KeywordTally::new();
        assert!(tally.is_empty());
        assert!(tally.into_counts(1).is_empty());
    }

    #[test]
    fn test_place_keyword_set_expands_counts() {
        let counts = vec![count(1, "커피", 3), count(2, "빵", 5), count(1, "분위기", 1)];
        let set = PlaceKeywordSet::from_counts(1, &counts);
        assert_eq!(set.keywords, vec!["커피", "커피", "커피", "분위기"]);
        assert_eq!(set.len(), 4);
        assert_eq!(set.distinct(), vec!["커피", "분위기"]);
    }

    #[test]
    fn test_place_keyword_set_ignores_non_positive_counts() {
        let set = PlaceKeywordSet::from_counts(1, &[count(1, "커피", 0), count(1, "빵", -2)]);
        assert!(set.is_empty());
    }

    #[test]
    fn test_cluster_label_raw_round_trip() {
        assert_eq!(ClusterLabel::from_raw(-1), ClusterLabel::Noise);
        assert_eq!(ClusterLabel::from_raw(-7), ClusterLabel::Noise);
        assert_eq!(ClusterLabel::from_raw(3), ClusterLabel::Cluster(3));
        assert_eq!(ClusterLabel::Noise.as_raw(), NOISE_LABEL);
        assert!(ClusterLabel::Noise.is_noise());
        assert!(!ClusterLabel::Cluster(0).is_noise());
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::EmptyText.to_string(), "empty_text");
        assert_eq!(
            SkipReason::InsufficientKeywords { count: 2 }.to_string(),
            "insufficient_keywords(2)"
        );
    }

    #[test]
    fn test_job_status_from_str() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("cancelled".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_job_kind_from_str() {
        for kind in [
            JobKind::ExtractAndCluster,
            JobKind::ExtractOnly,
            JobKind::ClusterOnly,
        ] {
            assert_eq!(kind.as_str().parse::<JobKind>().unwrap(), kind);
        }
        assert_eq!(JobKind::default(), JobKind::ExtractAndCluster);
    }

    #[test]
    fn test_pipeline_report_serialization() {
        let report = PipelineReport {
            extraction: ExtractionReport {
                places: 3,
                reviews_analyzed: 10,
                reviews_skipped: 1,
                keyword_rows: 25,
            },
            clustering: ClusteringReport {
                places_total: 3,
                places_clustered: 2,
                places_skipped: 1,
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["extraction"]["keyword_rows"], 25);
        assert_eq!(json["clustering"]["places_skipped"], 1);
    }

    #[test]
    fn test_place_clusters_members() {
        let clusters = PlaceClusters {
            rows: vec![
                ClusteredKeywordRow {
                    place_id: 1,
                    cluster_id: 0,
                    keyword: "커피".into(),
                    count: 2,
                },
                ClusteredKeywordRow {
                    place_id: 1,
                    cluster_id: 1,
                    keyword: "빵".into(),
                    count: 1,
                },
            ],
            summaries: vec![],
            noise: 0,
        };
        assert_eq!(clusters.members(0).into_iter().collect::<Vec<_>>(), vec!["커피"]);
        assert!(clusters.members(5).is_empty());
    }
}
