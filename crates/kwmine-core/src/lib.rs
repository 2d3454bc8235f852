//! # kwmine-core
//!
//! Core types, traits, and abstractions for the kwmine review keyword
//! pipeline.
//!
//! This crate provides the data structures, storage and backend traits, the
//! stopword configuration and the token filter that the other kwmine crates
//! build on.

pub mod defaults;
pub mod error;
pub mod filter;
pub mod logging;
pub mod memory;
pub mod models;
pub mod stopwords;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use filter::{predicate_lemma, KeywordFilter, RejectReason, TokenDecision};
pub use memory::MemoryStore;
pub use models::*;
pub use stopwords::Stopwords;
pub use traits::*;
