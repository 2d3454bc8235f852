//! Representative keyword selection.
//!
//! Each cluster member is scored by a blend of its normalized TF-IDF score and
//! its normalized closeness to the cluster centroid:
//!
//! ```text
//! score = w_tfidf * norm(tfidf) + w_centrality * (1 - norm(cosine_distance))
//! ```
//!
//! Min-max normalization maps a constant series (or a single member) to 0.
//! The highest score wins; ties go to the earliest member.

use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use kwmine_core::defaults::{CENTRALITY_WEIGHT, TFIDF_WEIGHT};
use kwmine_core::{ClusterLabel, Embedding, Error, Result};

/// Chosen representative of one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterPick {
    pub cluster_id: i32,
    pub representative: String,
    /// Non-noise occurrences in the cluster.
    pub member_count: usize,
    pub score: f64,
}

/// Cosine distance; a zero-norm operand is maximally distant.
pub fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Min-max normalize into `[0, 1]`; constant input maps to all zeros.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if values.len() <= 1 || !range.is_finite() || range == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

fn centroid(vectors: &[&[f64]]) -> Vec<f64> {
    let dim = vectors.first().map(|v| v.len()).unwrap_or(0);
    let mut mean = vec![0.0; dim];
    for v in vectors {
        for (m, x) in mean.iter_mut().zip(v.iter()) {
            *m += x;
        }
    }
    let n = vectors.len().max(1) as f64;
    mean.iter_mut().for_each(|m| *m /= n);
    mean
}

/// Weighted TF-IDF/centrality scorer.
#[derive(Debug, Clone)]
pub struct RepresentativeSelector {
    tfidf_weight: f64,
    centrality_weight: f64,
}

impl Default for RepresentativeSelector {
    fn default() -> Self {
        Self {
            tfidf_weight: TFIDF_WEIGHT,
            centrality_weight: CENTRALITY_WEIGHT,
        }
    }
}

impl RepresentativeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(mut self, tfidf_weight: f64, centrality_weight: f64) -> Self {
        self.tfidf_weight = tfidf_weight;
        self.centrality_weight = centrality_weight;
        self
    }

    /// Pick one representative per non-noise cluster, in ascending cluster id.
    ///
    /// `keywords`, `labels` and `embeddings` are parallel. Keywords missing
    /// from `tfidf` score 0.
    pub fn select(
        &self,
        keywords: &[String],
        labels: &[ClusterLabel],
        embeddings: &[Embedding],
        tfidf: &HashMap<String, f64>,
    ) -> Result<Vec<ClusterPick>> {
        if keywords.len() != labels.len() || keywords.len() != embeddings.len() {
            return Err(Error::Clustering(format!(
                "length mismatch: {} keywords, {} labels, {} embeddings",
                keywords.len(),
                labels.len(),
                embeddings.len()
            )));
        }

        let mut members: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (i, label) in labels.iter().enumerate() {
            if let ClusterLabel::Cluster(id) = label {
                members.entry(*id).or_default().push(i);
            }
        }

        let vectors: Vec<Vec<f64>> = embeddings
            .iter()
            .map(|e| e.iter().map(|&x| f64::from(x)).collect())
            .collect();

        let mut picks = Vec::with_capacity(members.len());
        for (cluster_id, indices) in members {
            let member_vectors: Vec<&[f64]> =
                indices.iter().map(|&i| vectors[i].as_slice()).collect();
            let center = centroid(&member_vectors);

            let distances: Vec<f64> = member_vectors
                .iter()
                .map(|v| cosine_distance(v, &center))
                .collect();
            let scores: Vec<f64> = indices
                .iter()
                .map(|&i| tfidf.get(&keywords[i]).copied().unwrap_or(0.0))
                .collect();

            let norm_distance = min_max_normalize(&distances);
            let norm_tfidf = min_max_normalize(&scores);

            let mut best = 0;
            let mut best_score = f64::NEG_INFINITY;
            for (pos, &i) in indices.iter().enumerate() {
                let score = self.tfidf_weight * norm_tfidf[pos]
                    + self.centrality_weight * (1.0 - norm_distance[pos]);
                trace!(cluster_id, keyword = %keywords[i], score, "Member score");
                if score > best_score {
                    best = pos;
                    best_score = score;
                }
            }

            picks.push(ClusterPick {
                cluster_id,
                representative: keywords[indices[best]].clone(),
                member_count: indices.len(),
                score: best_score,
            });
        }
        Ok(picks)
    }
}
