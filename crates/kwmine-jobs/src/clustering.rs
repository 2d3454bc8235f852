//! Clustering stage: stored counts → per-place clusters and summaries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use kwmine_cluster::{expand_embeddings, PlaceClusterer, TfIdfVectorizer};
use kwmine_core::defaults::{
    CLUSTERING_PROGRESS_END, EXTRACTION_PROGRESS_END, STAGE_CLUSTERING_COMPLETED,
    STAGE_CLUSTERING_STARTED,
};
use kwmine_core::{
    ClusterStore, ClusteringReport, EmbeddingBackend, Error, KeywordCount, KeywordStore,
    PlaceClusters, PlaceId, PlaceKeywordSet, PlaceOutcome, ProgressSink, Result, SkipReason,
};

/// Group stored counts by place in first-seen row order and expand each
/// row into `count` occurrences.
pub fn group_by_place(counts: &[KeywordCount]) -> Vec<PlaceKeywordSet> {
    let mut order: Vec<PlaceId> = Vec::new();
    let mut keywords: HashMap<PlaceId, Vec<String>> = HashMap::new();
    for count in counts {
        let entry = keywords.entry(count.place_id).or_insert_with(|| {
            order.push(count.place_id);
            Vec::new()
        });
        for _ in 0..count.count.max(0) {
            entry.push(count.keyword.clone());
        }
    }
    order
        .into_iter()
        .map(|place_id| {
            let list = keywords.remove(&place_id).unwrap_or_default();
            PlaceKeywordSet::new(place_id, list)
        })
        .collect()
}

/// Percent reported after `processed` of `total` places.
pub fn clustering_percent(processed: usize, total: usize) -> i32 {
    let span = (CLUSTERING_PROGRESS_END - EXTRACTION_PROGRESS_END) as usize;
    if total == 0 {
        return CLUSTERING_PROGRESS_END;
    }
    EXTRACTION_PROGRESS_END + (processed * span / total) as i32
}

/// Rebuilds `clustered_keywords` and `cluster_summaries` from stored counts.
#[derive(Clone)]
pub struct ClusteringStage {
    keywords: Arc<dyn KeywordStore>,
    clusters: Arc<dyn ClusterStore>,
    embedder: Arc<dyn EmbeddingBackend>,
    clusterer: Arc<PlaceClusterer>,
}

impl ClusteringStage {
    pub fn new(
        keywords: Arc<dyn KeywordStore>,
        clusters: Arc<dyn ClusterStore>,
        embedder: Arc<dyn EmbeddingBackend>,
        clusterer: PlaceClusterer,
    ) -> Self {
        Self {
            keywords,
            clusters,
            embedder,
            clusterer: Arc::new(clusterer),
        }
    }

    /// Reset the output tables and cluster every place.
    ///
    /// Place-level failures are logged and counted; reset and read failures
    /// abort the stage.
    #[instrument(skip(self, progress), fields(subsystem = "jobs", component = "clustering"))]
    pub async fn run(&self, progress: &dyn ProgressSink) -> Result<ClusteringReport> {
        let start = Instant::now();
        self.clusters.reset().await?;
        progress.report(EXTRACTION_PROGRESS_END, STAGE_CLUSTERING_STARTED);

        let counts = self.keywords.list_counts().await?;
        let places = group_by_place(&counts);
        let vectorizer = TfIdfVectorizer::fit(
            &places
                .iter()
                .flat_map(|p| p.keywords.iter().map(String::as_str))
                .collect::<Vec<_>>(),
        );
        info!(
            places = places.len(),
            vocabulary = vectorizer.vocabulary_size(),
            model = self.embedder.model_name(),
            "Keyword clustering started"
        );

        let mut report = ClusteringReport {
            places_total: places.len(),
            ..Default::default()
        };
        let total = places.len();

        for (index, place) in places.iter().enumerate() {
            match self.process_place(place, &vectorizer).await {
                PlaceOutcome::Clustered(clusters) => {
                    report.places_clustered += 1;
                    report.clusters_written += clusters.summaries.len();
                    report.keyword_rows_written += clusters.rows.len();
                }
                PlaceOutcome::Skipped(reason) => {
                    info!(place_id = place.place_id, skip_reason = %reason, "Place not clustered");
                    report.places_skipped += 1;
                }
                PlaceOutcome::Failed(error) => {
                    warn!(place_id = place.place_id, %error, "Place clustering failed");
                    report.places_failed += 1;
                }
            }
            let processed = index + 1;
            progress.report(
                clustering_percent(processed, total),
                &format!("clustering_place_{}", processed),
            );
        }

        progress.report(CLUSTERING_PROGRESS_END, STAGE_CLUSTERING_COMPLETED);
        info!(
            places_clustered = report.places_clustered,
            places_skipped = report.places_skipped,
            places_failed = report.places_failed,
            clusters_written = report.clusters_written,
            duration_ms = start.elapsed().as_millis() as u64,
            "Keyword clustering completed"
        );
        Ok(report)
    }

    /// Cluster and persist one place, folding every error into the outcome.
    pub async fn process_place(
        &self,
        place: &PlaceKeywordSet,
        vectorizer: &TfIdfVectorizer,
    ) -> PlaceOutcome {
        if !self.clusterer.config().has_enough_keywords(place.len()) {
            return PlaceOutcome::Skipped(SkipReason::InsufficientKeywords { count: place.len() });
        }
        let clusters = match self.cluster_place(place, vectorizer).await {
            Ok(clusters) => clusters,
            Err(e) => return PlaceOutcome::Failed(e.to_string()),
        };
        if !clusters.is_empty() {
            if let Err(e) = self.clusters.write_place(place.place_id, &clusters).await {
                return PlaceOutcome::Failed(e.to_string());
            }
        }
        PlaceOutcome::Clustered(clusters)
    }

    async fn cluster_place(
        &self,
        place: &PlaceKeywordSet,
        vectorizer: &TfIdfVectorizer,
    ) -> Result<PlaceClusters> {
        let distinct = place.distinct();
        let vectors = self.embedder.embed_texts(&distinct).await?;
        let embeddings = expand_embeddings(&place.keywords, &distinct, vectors)?;
        let tfidf = vectorizer.scores(distinct.iter().map(String::as_str));

        let clusterer = self.clusterer.clone();
        let place = place.clone();
        let place_id = place.place_id;
        tokio::task::spawn_blocking(move || clusterer.cluster_place(&place, &embeddings, &tfidf))
            .await
            .map_err(|e| {
                Error::Internal(format!("clustering task for place {} failed: {}", place_id, e))
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kc(place_id: PlaceId, keyword: &str, count: i64) -> KeywordCount {
        KeywordCount {
            place_id,
            keyword: keyword.to_string(),
            count,
        }
    }

    #[test]
    fn test_group_by_place_expands_in_row_order() {
        let places = group_by_place(&[
            kc(2, "커피", 2),
            kc(1, "라떼", 1),
            kc(2, "분위기", 1),
        ]);
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].place_id, 2);
        assert_eq!(places[0].keywords, vec!["커피", "커피", "분위기"]);
        assert_eq!(places[1].keywords, vec!["라떼"]);
    }

    #[test]
    fn test_group_by_place_empty() {
        assert!(group_by_place(&[]).is_empty());
    }

    #[test]
    fn test_clustering_percent() {
        assert_eq!(clustering_percent(0, 4), 50);
        assert_eq!(clustering_percent(2, 4), 75);
        assert_eq!(clustering_percent(4, 4), 100);
        assert_eq!(clustering_percent(0, 0), 100);
    }
}
