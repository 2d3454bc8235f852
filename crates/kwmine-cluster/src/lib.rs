//! # kwmine-cluster
//!
//! Semantic grouping of a place's review keywords.
//!
//! - [`tfidf`]: corpus-wide TF-IDF keyword scores
//! - [`clusterer`]: HDBSCAN over keyword embeddings with noise rejection
//! - [`representative`]: TF-IDF/centrality scoring of cluster members
//! - [`rows`]: aggregation into persisted rows and summaries
//! - [`place`]: the per-place combination of the above

pub mod clusterer;
pub mod place;
pub mod representative;
pub mod rows;
pub mod tfidf;

pub use clusterer::{ClusterConfig, KeywordClusterer};
pub use place::{expand_embeddings, PlaceClusterer};
pub use representative::{ClusterPick, RepresentativeSelector};
pub use rows::build_place_clusters;
pub use tfidf::TfIdfVectorizer;
