//! Per-place clustering: labels, representatives and output rows.

use std::collections::HashMap;
use std::time::Instant;

use tracing::debug;

use kwmine_core::{Embedding, Error, PlaceClusters, PlaceKeywordSet, Result};

use crate::clusterer::{ClusterConfig, KeywordClusterer};
use crate::representative::RepresentativeSelector;
use crate::rows::build_place_clusters;

/// Map vectors of distinct keywords back onto every occurrence.
pub fn expand_embeddings(
    keywords: &[String],
    distinct: &[String],
    vectors: Vec<Embedding>,
) -> Result<Vec<Embedding>> {
    if distinct.len() != vectors.len() {
        return Err(Error::Embedding(format!(
            "expected {} vectors, got {}",
            distinct.len(),
            vectors.len()
        )));
    }
    let by_keyword: HashMap<&str, Embedding> = distinct
        .iter()
        .map(String::as_str)
        .zip(vectors)
        .collect();
    keywords
        .iter()
        .map(|k| {
            by_keyword
                .get(k.as_str())
                .cloned()
                .ok_or_else(|| Error::Embedding(format!("no vector for keyword {}", k)))
        })
        .collect()
}

/// Clusters one place's keyword occurrences and picks representatives.
#[derive(Debug, Clone, Default)]
pub struct PlaceClusterer {
    clusterer: KeywordClusterer,
    selector: RepresentativeSelector,
}

impl PlaceClusterer {
    pub fn new(config: ClusterConfig) -> Self {
        Self {
            clusterer: KeywordClusterer::new(config),
            selector: RepresentativeSelector::new(),
        }
    }

    pub fn with_selector(mut self, selector: RepresentativeSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn config(&self) -> &ClusterConfig {
        self.clusterer.config()
    }

    /// Cluster `place` given one embedding per occurrence.
    pub fn cluster_place(
        &self,
        place: &PlaceKeywordSet,
        embeddings: &[Embedding],
        tfidf: &HashMap<String, f64>,
    ) -> Result<PlaceClusters> {
        let start = Instant::now();
        let labels = self.clusterer.cluster(embeddings)?;
        let picks = self
            .selector
            .select(&place.keywords, &labels, embeddings, tfidf)?;
        let clusters = build_place_clusters(place.place_id, &place.keywords, &labels, &picks);

        debug!(
            subsystem = "cluster",
            component = "place",
            place_id = place.place_id,
            keyword_count = place.len(),
            cluster_count = clusters.summaries.len(),
            noise_count = clusters.noise,
            duration_ms = start.elapsed().as_millis() as u64,
            "Place clustered"
        );
        Ok(clusters)
    }
}
