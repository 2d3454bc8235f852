//! HDBSCAN clustering of keyword embeddings.

use hdbscan::{Hdbscan, HdbscanHyperParams};
use tracing::debug;

use kwmine_core::defaults::{
    CLUSTER_SELECTION_EPSILON, MIN_CLUSTER_SIZE, MIN_KEYWORDS_FOR_CLUSTERING, MIN_SAMPLES,
};
use kwmine_core::{ClusterLabel, Embedding, Error, Result};

/// Clustering parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    /// Smallest group HDBSCAN reports as a cluster.
    pub min_cluster_size: usize,
    /// Neighbourhood size for core distances.
    pub min_samples: usize,
    /// Clusters closer than this are merged.
    pub epsilon: f64,
    /// Places with this many keyword entries or fewer are skipped.
    pub min_keywords: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: MIN_CLUSTER_SIZE,
            min_samples: MIN_SAMPLES,
            epsilon: CLUSTER_SELECTION_EPSILON,
            min_keywords: MIN_KEYWORDS_FOR_CLUSTERING,
        }
    }
}

impl ClusterConfig {
    /// Load configuration from environment variables.
    ///
    /// - `KWMINE_MIN_CLUSTER_SIZE`
    /// - `KWMINE_CLUSTER_EPSILON`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(size) = std::env::var("KWMINE_MIN_CLUSTER_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            config = config.with_min_cluster_size(size);
        }
        if let Some(eps) = std::env::var("KWMINE_CLUSTER_EPSILON")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
        {
            config = config.with_epsilon(eps);
        }
        config
    }

    pub fn with_min_cluster_size(mut self, size: usize) -> Self {
        self.min_cluster_size = size.max(2);
        self
    }

    pub fn with_min_samples(mut self, samples: usize) -> Self {
        self.min_samples = samples.max(1);
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon.max(0.0);
        self
    }

    pub fn with_min_keywords(mut self, min_keywords: usize) -> Self {
        self.min_keywords = min_keywords;
        self
    }

    /// Whether a place with `keyword_count` entries has enough signal.
    pub fn has_enough_keywords(&self, keyword_count: usize) -> bool {
        keyword_count > self.min_keywords
    }
}

/// Density-based clusterer over Euclidean distance.
#[derive(Debug, Clone, Default)]
pub struct KeywordClusterer {
    config: ClusterConfig,
}

impl KeywordClusterer {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Label every embedding with a cluster id or noise.
    ///
    /// Fewer points than `min_cluster_size` cannot form a cluster and come
    /// back as all noise.
    pub fn cluster(&self, embeddings: &[Embedding]) -> Result<Vec<ClusterLabel>> {
        if embeddings.is_empty() {
            return Ok(vec![]);
        }
        let dim = embeddings[0].len();
        if dim == 0 {
            return Err(Error::Clustering("embeddings have dimension 0".into()));
        }
        if let Some(bad) = embeddings.iter().position(|e| e.len() != dim) {
            return Err(Error::Clustering(format!(
                "embedding {} has dimension {}, expected {}",
                bad,
                embeddings[bad].len(),
                dim
            )));
        }
        if embeddings.len() < self.config.min_cluster_size {
            return Ok(vec![ClusterLabel::Noise; embeddings.len()]);
        }

        let params = HdbscanHyperParams::builder()
            .min_cluster_size(self.config.min_cluster_size)
            .min_samples(self.config.min_samples)
            .epsilon(self.config.epsilon)
            .build();

        let labels = Hdbscan::new(embeddings, params)
            .cluster()
            .map_err(|e| Error::Clustering(format!("HDBSCAN failed: {:?}", e)))?;

        let labels: Vec<ClusterLabel> = labels.into_iter().map(ClusterLabel::from_raw).collect();
        debug!(
            subsystem = "cluster",
            component = "hdbscan",
            points = labels.len(),
            noise_count = labels.iter().filter(|l| l.is_noise()).count(),
            "Clustering complete"
        );
        Ok(labels)
    }
}
