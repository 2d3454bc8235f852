//! Aggregation of cluster labels into persisted rows.

use std::collections::BTreeMap;

use kwmine_core::{ClusterLabel, ClusterSummary, ClusteredKeywordRow, PlaceClusters, PlaceId};

use crate::representative::ClusterPick;

/// Count `(cluster, keyword)` pairs over non-noise assignments and attach one
/// summary per pick.
///
/// Rows come out ordered by cluster id, then first occurrence of the keyword.
pub fn build_place_clusters(
    place_id: PlaceId,
    keywords: &[String],
    labels: &[ClusterLabel],
    picks: &[ClusterPick],
) -> PlaceClusters {
    let mut per_cluster: BTreeMap<i32, Vec<(String, i64)>> = BTreeMap::new();
    let mut noise = 0;

    for (keyword, label) in keywords.iter().zip(labels) {
        let ClusterLabel::Cluster(cluster_id) = *label else {
            noise += 1;
            continue;
        };
        let entries = per_cluster.entry(cluster_id).or_default();
        match entries.iter_mut().find(|(k, _)| k == keyword) {
            Some((_, count)) => *count += 1,
            None => entries.push((keyword.clone(), 1)),
        }
    }

    let rows = per_cluster
        .into_iter()
        .flat_map(|(cluster_id, entries)| {
            entries
                .into_iter()
                .map(move |(keyword, count)| ClusteredKeywordRow {
                    place_id,
                    cluster_id,
                    keyword,
                    count,
                })
        })
        .collect();

    let summaries = picks
        .iter()
        .map(|pick| ClusterSummary {
            place_id,
            cluster_id: pick.cluster_id,
            representative_keyword: pick.representative.clone(),
            keyword_count: pick.member_count as i64,
        })
        .collect();

    PlaceClusters {
        rows,
        summaries,
        noise,
    }
}
