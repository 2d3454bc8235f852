//! Centralized default constants for kwmine.
//!
//! All crates reference these constants instead of defining their own magic
//! numbers. Organized by pipeline stage.

// =============================================================================
// TOKENIZER / FILTER
// =============================================================================

/// Minimum keyword length in characters (Unicode scalar values).
pub const MIN_KEYWORD_CHARS: usize = 2;

/// Lemma suffix appended to adjective/verb stems (dictionary form).
pub const LEMMA_SUFFIX: &str = "다";

/// Common-noun POS tag.
pub const TAG_COMMON_NOUN: &str = "NNG";

/// Proper-noun POS tag.
pub const TAG_PROPER_NOUN: &str = "NNP";

/// Adjective-stem POS tag prefix.
pub const TAG_ADJECTIVE_PREFIX: &str = "VA";

/// Verb-stem POS tag prefix.
pub const TAG_VERB_PREFIX: &str = "VV";

// =============================================================================
// PROGRESS
// =============================================================================

/// Progress percentage reached when extraction finishes.
pub const EXTRACTION_PROGRESS_END: i32 = 50;

/// Progress percentage reached when clustering finishes.
pub const CLUSTERING_PROGRESS_END: i32 = 100;

/// Stage label reported when extraction finishes.
pub const STAGE_EXTRACTION_COMPLETED: &str = "extraction_completed";

/// Stage label reported when clustering starts.
pub const STAGE_CLUSTERING_STARTED: &str = "clustering_started";

/// Stage label reported when clustering finishes.
pub const STAGE_CLUSTERING_COMPLETED: &str = "clustering_completed";

// =============================================================================
// EMBEDDING
// =============================================================================

/// Default Ollama-compatible embedding endpoint.
pub const EMBED_URL: &str = "http://127.0.0.1:11434";

/// Default embedding model (multilingual, handles Korean).
pub const EMBED_MODEL: &str = "bge-m3";

/// Default embedding vector dimension for bge-m3.
pub const EMBED_DIMENSION: usize = 1024;

/// Timeout for embedding requests in seconds.
pub const EMBED_TIMEOUT_SECS: u64 = 60;

/// Maximum keywords per embedding request.
pub const EMBED_BATCH_SIZE: usize = 64;

// =============================================================================
// CLUSTERING
// =============================================================================

/// Places with this many keyword entries or fewer are not clustered.
pub const MIN_KEYWORDS_FOR_CLUSTERING: usize = 2;

/// HDBSCAN minimum cluster size.
pub const MIN_CLUSTER_SIZE: usize = 2;

/// HDBSCAN minimum samples (a single dense point can seed a cluster).
pub const MIN_SAMPLES: usize = 1;

/// HDBSCAN cluster selection epsilon.
pub const CLUSTER_SELECTION_EPSILON: f64 = 0.1;

/// Weight of normalized TF-IDF in the representative score.
pub const TFIDF_WEIGHT: f64 = 0.5;

/// Weight of normalized centrality in the representative score.
pub const CENTRALITY_WEIGHT: f64 = 0.5;

/// Cluster label used for noise points.
pub const NOISE_LABEL: i32 = -1;

// =============================================================================
// JOB PROCESSING
// =============================================================================

/// Default polling interval for the job worker in milliseconds.
pub const JOB_POLL_INTERVAL_MS: u64 = 1000;

/// Default job timeout in seconds. Full runs over a region take a while.
pub const JOB_TIMEOUT_SECS: u64 = 6 * 60 * 60;

/// Default worker event broadcast capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// DATABASE
// =============================================================================

/// Default maximum number of pooled connections.
pub const DB_MAX_CONNECTIONS: u32 = 5;

/// Fewest connections a pipeline run needs at once: the run-wide extraction
/// transaction, review reads beside it, and job progress writes.
pub const DB_PIPELINE_MIN_CONNECTIONS: u32 = 3;

/// Default connection acquire timeout in seconds.
pub const DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default idle connection timeout in seconds.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;
