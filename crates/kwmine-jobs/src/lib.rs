//! # kwmine-jobs
//!
//! Keyword extraction and clustering pipeline for kwmine.
//!
//! This crate provides:
//! - The extraction stage (reviews → keyword counts)
//! - The clustering stage (keyword counts → clusters and representatives)
//! - A job handler running both stages with progress reporting
//! - A polling job worker with event broadcasting
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use kwmine_jobs::{KeywordPipelineHandler, PipelineBuilder, WorkerBuilder, WorkerConfig};
//!
//! let db = kwmine_db::Database::connect("postgres://...").await?;
//! let pipeline = PipelineBuilder::new(
//!     Arc::new(db.reviews.clone()),
//!     Arc::new(db.keywords.clone()),
//!     Arc::new(db.clusters.clone()),
//!     Arc::new(kwmine_inference::LinderaAnalyzer::new()?),
//!     Arc::new(kwmine_inference::OllamaEmbedder::from_env()?),
//!     kwmine_core::KeywordFilter::new(kwmine_core::Stopwords::from_env()?),
//! )
//! .build();
//!
//! let handle = WorkerBuilder::new(Arc::new(db.jobs.clone()))
//!     .with_config(WorkerConfig::from_env())
//!     .with_handler(KeywordPipelineHandler::new(pipeline))
//!     .build()
//!     .start();
//!
//! let mut events = handle.events();
//! while let Ok(event) = events.recv().await {
//!     println!("Event: {:?}", event);
//! }
//! ```

pub mod clustering;
pub mod extraction;
pub mod handler;
pub mod pipeline;
pub mod worker;

// Re-export core types
pub use kwmine_core::*;

pub use clustering::{clustering_percent, group_by_place, ClusteringStage};
pub use extraction::{extract_place, extraction_percent, ExtractionStage, PlaceExtraction};
pub use handler::{JobContext, JobHandler, JobResult, NoOpHandler};
pub use pipeline::{KeywordPipeline, KeywordPipelineHandler, PipelineBuilder};
pub use worker::{JobWorker, WorkerBuilder, WorkerConfig, WorkerEvent, WorkerHandle};
