//! # kwmine-db
//!
//! PostgreSQL storage layer for kwmine.
//!
//! This crate provides:
//! - Connection pool management
//! - Review source, keyword count, cluster output and job repositories
//! - Embedded schema migrations
//!
//! ## Example
//!
//! ```rust,ignore
//! use kwmine_db::{Database, KeywordStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/kwmine").await?;
//!     db.migrate().await?;
//!     let counts = db.keywords.list_counts().await?;
//!     println!("{} keyword rows", counts.len());
//!     Ok(())
//! }
//! ```

pub mod clusters;
pub mod jobs;
pub mod keywords;
pub mod pool;
pub mod reviews;

// Always compiled so integration tests in tests/ can use it.
pub mod test_fixtures;

// Re-export core types
pub use kwmine_core::*;

pub use clusters::PgClusterRepository;
pub use jobs::PgJobRepository;
pub use keywords::{PgKeywordCountRun, PgKeywordRepository};
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use reviews::PgReviewRepository;

/// Database handle bundling every repository over one pool.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Places and scraped reviews.
    pub reviews: PgReviewRepository,
    /// Per-place keyword counts.
    pub keywords: PgKeywordRepository,
    /// Clustered keyword rows and cluster summaries.
    pub clusters: PgClusterRepository,
    /// Keyword pipeline jobs.
    pub jobs: PgJobRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            reviews: PgReviewRepository::new(pool.clone()),
            keywords: PgKeywordRepository::new(pool.clone()),
            clusters: PgClusterRepository::new(pool.clone()),
            jobs: PgJobRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Connect with a custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
