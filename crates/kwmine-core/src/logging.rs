//! Structured logging field names for kwmine.
//!
//! Every crate logs with these names so that aggregated logs can be queried
//! uniformly across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Run-fatal failures, job marked failed |
//! | WARN  | Place-level failure, place skipped |
//! | INFO  | Stage start/finish, insufficient-signal skips, job lifecycle |
//! | DEBUG | Per-place counts, configuration choices |
//! | TRACE | Per-token and per-keyword detail |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "db", "inference", "cluster", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "ollama", "lindera", "extraction", "clustering", "worker"
pub const COMPONENT: &str = "component";

/// Logical operation name.
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Place being processed.
pub const PLACE_ID: &str = "place_id";

/// Job UUID being processed.
pub const JOB_ID: &str = "job_id";

/// Cluster identifier within a place.
pub const CLUSTER_ID: &str = "cluster_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of reviews read for a place.
pub const REVIEW_COUNT: &str = "review_count";

/// Number of keyword entries (non-deduplicated) for a place.
pub const KEYWORD_COUNT: &str = "keyword_count";

/// Number of texts sent to an embedding model.
pub const INPUT_COUNT: &str = "input_count";

/// Number of clusters produced.
pub const CLUSTER_COUNT: &str = "cluster_count";

/// Number of points labelled noise.
pub const NOISE_COUNT: &str = "noise_count";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for embedding.
pub const MODEL: &str = "model";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Reason a place or review was skipped.
pub const SKIP_REASON: &str = "skip_reason";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";
