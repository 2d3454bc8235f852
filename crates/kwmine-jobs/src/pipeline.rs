//! Extract-then-cluster pipeline and its job handler.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use kwmine_cluster::PlaceClusterer;
use kwmine_core::{
    ClusterStore, EmbeddingBackend, JobKind, KeywordFilter, KeywordStore, MorphAnalyzer,
    PipelineReport, ProgressSink, Result, ReviewSource,
};

use crate::clustering::ClusteringStage;
use crate::extraction::ExtractionStage;
use crate::handler::{JobContext, JobHandler, JobResult};

/// Both pipeline stages over shared stores and backends.
#[derive(Clone)]
pub struct KeywordPipeline {
    extraction: ExtractionStage,
    clustering: ClusteringStage,
}

impl KeywordPipeline {
    pub fn new(extraction: ExtractionStage, clustering: ClusteringStage) -> Self {
        Self {
            extraction,
            clustering,
        }
    }

    pub fn extraction(&self) -> &ExtractionStage {
        &self.extraction
    }

    pub fn clustering(&self) -> &ClusteringStage {
        &self.clustering
    }

    /// Run the stages selected by `kind`. Clustering only starts after
    /// extraction committed.
    pub async fn run(&self, kind: JobKind, progress: &dyn ProgressSink) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();
        if matches!(kind, JobKind::ExtractAndCluster | JobKind::ExtractOnly) {
            report.extraction = self.extraction.run(progress).await?;
        }
        if matches!(kind, JobKind::ExtractAndCluster | JobKind::ClusterOnly) {
            report.clustering = self.clustering.run(progress).await?;
        }
        Ok(report)
    }
}

/// Builder wiring stores and backends into a [`KeywordPipeline`].
pub struct PipelineBuilder {
    reviews: Arc<dyn ReviewSource>,
    keywords: Arc<dyn KeywordStore>,
    clusters: Arc<dyn ClusterStore>,
    analyzer: Arc<dyn MorphAnalyzer>,
    embedder: Arc<dyn EmbeddingBackend>,
    filter: KeywordFilter,
    clusterer: PlaceClusterer,
}

impl PipelineBuilder {
    pub fn new(
        reviews: Arc<dyn ReviewSource>,
        keywords: Arc<dyn KeywordStore>,
        clusters: Arc<dyn ClusterStore>,
        analyzer: Arc<dyn MorphAnalyzer>,
        embedder: Arc<dyn EmbeddingBackend>,
        filter: KeywordFilter,
    ) -> Self {
        Self {
            reviews,
            keywords,
            clusters,
            analyzer,
            embedder,
            filter,
            clusterer: PlaceClusterer::default(),
        }
    }

    pub fn with_clusterer(mut self, clusterer: PlaceClusterer) -> Self {
        self.clusterer = clusterer;
        self
    }

    pub fn build(self) -> KeywordPipeline {
        let extraction = ExtractionStage::new(
            self.reviews,
            self.keywords.clone(),
            self.analyzer,
            self.filter,
        );
        let clustering =
            ClusteringStage::new(self.keywords, self.clusters, self.embedder, self.clusterer);
        KeywordPipeline::new(extraction, clustering)
    }
}

/// Handles every [`JobKind`] by running the pipeline.
pub struct KeywordPipelineHandler {
    pipeline: KeywordPipeline,
}

impl KeywordPipelineHandler {
    pub fn new(pipeline: KeywordPipeline) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl JobHandler for KeywordPipelineHandler {
    fn name(&self) -> &str {
        "keyword_pipeline"
    }

    fn can_handle(&self, _kind: JobKind) -> bool {
        true
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let job_id = ctx.job_id();
        let kind = ctx.kind();
        match self.pipeline.run(kind, &ctx).await {
            Ok(report) => {
                info!(%job_id, kind = kind.as_str(), "Keyword pipeline finished");
                match serde_json::to_value(&report) {
                    Ok(value) => JobResult::Success(Some(value)),
                    Err(e) => JobResult::Failed(format!("Failed to serialize report: {}", e)),
                }
            }
            Err(e) => {
                error!(%job_id, kind = kind.as_str(), error = %e, "Keyword pipeline failed");
                JobResult::Failed(e.to_string())
            }
        }
    }
}
