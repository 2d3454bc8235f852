//! Extraction stage: reviews → per-review keyword sets → per-place counts.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, trace};

use kwmine_core::defaults::{EXTRACTION_PROGRESS_END, STAGE_EXTRACTION_COMPLETED};
use kwmine_core::{
    Error, ExtractionReport, KeywordFilter, KeywordStore, KeywordTally, MorphAnalyzer, PlaceId,
    ProgressSink, RawReview, Result, ReviewKeywords, ReviewSource,
};

/// Keyword sets of one place's reviews.
#[derive(Debug, Default)]
pub struct PlaceExtraction {
    pub tally: KeywordTally,
    pub reviews_analyzed: usize,
    pub reviews_skipped: usize,
}

/// Analyze every review of one place. CPU-bound; call from a blocking thread.
pub fn extract_place(
    analyzer: &dyn MorphAnalyzer,
    filter: &KeywordFilter,
    reviews: &[RawReview],
) -> Result<PlaceExtraction> {
    let mut out = PlaceExtraction::default();
    for review in reviews {
        match filter.extract(analyzer, review.content())? {
            ReviewKeywords::Extracted(keywords) => {
                trace!(place_id = review.place_id, keywords = ?keywords, "Review analyzed");
                out.tally.add_review(&keywords);
                out.reviews_analyzed += 1;
            }
            ReviewKeywords::Skipped(reason) => {
                trace!(place_id = review.place_id, skip_reason = %reason, "Review skipped");
                out.reviews_skipped += 1;
            }
        }
    }
    Ok(out)
}

/// Percent reported after `processed` of `total` places.
pub fn extraction_percent(processed: usize, total: usize) -> i32 {
    if total == 0 {
        return EXTRACTION_PROGRESS_END;
    }
    (processed * EXTRACTION_PROGRESS_END as usize / total) as i32
}

/// Rebuilds the keyword count table from all reviews.
#[derive(Clone)]
pub struct ExtractionStage {
    reviews: Arc<dyn ReviewSource>,
    keywords: Arc<dyn KeywordStore>,
    analyzer: Arc<dyn MorphAnalyzer>,
    filter: Arc<KeywordFilter>,
}

impl ExtractionStage {
    pub fn new(
        reviews: Arc<dyn ReviewSource>,
        keywords: Arc<dyn KeywordStore>,
        analyzer: Arc<dyn MorphAnalyzer>,
        filter: KeywordFilter,
    ) -> Self {
        Self {
            reviews,
            keywords,
            analyzer,
            filter: Arc::new(filter),
        }
    }

    /// Reset the count table and re-extract every place in one run.
    ///
    /// Any error drops the open run, so previously committed counts survive.
    #[instrument(skip(self, progress), fields(subsystem = "jobs", component = "extraction"))]
    pub async fn run(&self, progress: &dyn ProgressSink) -> Result<ExtractionReport> {
        let start = Instant::now();
        let place_ids = self.reviews.list_place_ids().await?;
        let total = place_ids.len();
        info!(
            places = total,
            analyzer = self.analyzer.name(),
            "Keyword extraction started"
        );

        let mut run = self.keywords.begin_run().await?;
        let mut report = ExtractionReport::default();

        for (index, place_id) in place_ids.into_iter().enumerate() {
            let reviews = self.reviews.reviews_for_place(place_id).await?;
            let review_count = reviews.len();
            let extracted = self.extract_blocking(place_id, reviews).await?;

            let counts = extracted.tally.into_counts(place_id);
            if !counts.is_empty() {
                run.upsert_counts(&counts).await?;
            }
            debug!(
                place_id,
                review_count,
                keyword_count = counts.len(),
                "Place keywords counted"
            );

            report.places += 1;
            report.reviews_analyzed += extracted.reviews_analyzed;
            report.reviews_skipped += extracted.reviews_skipped;
            report.keyword_rows += counts.len();

            let processed = index + 1;
            progress.report(
                extraction_percent(processed, total),
                &format!("extracting_place_{}", processed),
            );
        }

        run.commit().await?;
        progress.report(EXTRACTION_PROGRESS_END, STAGE_EXTRACTION_COMPLETED);

        info!(
            places = report.places,
            reviews_analyzed = report.reviews_analyzed,
            reviews_skipped = report.reviews_skipped,
            keyword_rows = report.keyword_rows,
            duration_ms = start.elapsed().as_millis() as u64,
            "Keyword extraction completed"
        );
        Ok(report)
    }

    async fn extract_blocking(
        &self,
        place_id: PlaceId,
        reviews: Vec<RawReview>,
    ) -> Result<PlaceExtraction> {
        let analyzer = self.analyzer.clone();
        let filter = self.filter.clone();
        tokio::task::spawn_blocking(move || extract_place(analyzer.as_ref(), &filter, &reviews))
            .await
            .map_err(|e| {
                Error::Internal(format!("analysis task for place {} failed: {}", place_id, e))
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kwmine_core::{Morpheme, Stopwords};

    struct WordAnalyzer;

    impl MorphAnalyzer for WordAnalyzer {
        fn analyze(&self, text: &str) -> Result<Vec<Morpheme>> {
            Ok(text
                .split_whitespace()
                .map(|w| Morpheme::new(w, w, "NNG"))
                .collect())
        }

        fn name(&self) -> &str {
            "words"
        }
    }

    #[test]
    fn test_extraction_percent() {
        assert_eq!(extraction_percent(1, 4), 12);
        assert_eq!(extraction_percent(2, 4), 25);
        assert_eq!(extraction_percent(4, 4), 50);
        assert_eq!(extraction_percent(0, 0), 50);
    }

    #[test]
    fn test_extract_place_counts_reviews() {
        let filter = KeywordFilter::new(Stopwords::default());
        let reviews = vec![
            RawReview::new(1, "커피 커피 디저트"),
            RawReview::new(1, "  "),
            RawReview::new(1, "커피 분위기"),
        ];
        let out = extract_place(&WordAnalyzer, &filter, &reviews).unwrap();

        assert_eq!(out.reviews_analyzed, 2);
        assert_eq!(out.reviews_skipped, 1);
        assert_eq!(out.tally.count("커피"), 2);
        assert_eq!(out.tally.count("디저트"), 1);
    }
}
