//! # kwmine-inference
//!
//! Inference backends for kwmine.
//!
//! This crate provides:
//! - Ollama-compatible embedding backend (default)
//! - Deterministic mock embedding backend for tests and dry runs
//! - Korean morphological analyzer on lindera + ko-dic (feature `korean`)
//!
//! # Feature Flags
//!
//! - `ollama` (default): Enable Ollama backend
//! - `korean` (default): Enable the lindera analyzer with the embedded dictionary
//!
//! # Example
//!
//! ```rust,no_run
//! use kwmine_inference::OllamaEmbedder;
//! use kwmine_core::EmbeddingBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OllamaEmbedder::from_env().unwrap();
//!     let texts = vec!["분위기".to_string()];
//!     let embeddings = backend.embed_texts(&texts).await.unwrap();
//! }
//! ```

pub mod mock;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "korean")]
pub mod morph;

pub use mock::MockEmbedder;

#[cfg(feature = "ollama")]
pub use ollama::OllamaEmbedder;

#[cfg(feature = "korean")]
pub use morph::LinderaAnalyzer;
