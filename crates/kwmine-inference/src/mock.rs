//! Mock embedding backend for deterministic testing.
//!
//! Vectors are seeded from a BLAKE3 hash of the text, so identical keywords
//! always map to identical vectors. Specific keywords can be pinned to fixed
//! vectors to build clustering scenarios with known geometry.
//!
//! ```rust
//! use kwmine_core::EmbeddingBackend;
//! use kwmine_inference::MockEmbedder;
//!
//! # tokio_test_block(async {
//! let backend = MockEmbedder::new(8).with_vector("커피", vec![1.0; 8]);
//! let vectors = backend.embed_texts(&["커피".to_string()]).await.unwrap();
//! assert_eq!(vectors[0], vec![1.0; 8]);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use kwmine_core::{Embedding, EmbeddingBackend, Error, Result};

/// Deterministic embedding backend.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimension: usize,
    fixed: HashMap<String, Embedding>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fixed: HashMap::new(),
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Pin `text` to `vector`. The vector length must match the dimension.
    pub fn with_vector(mut self, text: impl Into<String>, vector: Embedding) -> Self {
        self.fixed.insert(text.into(), vector);
        self
    }

    /// Make every call fail.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Number of `embed_texts` calls so far (shared across clones).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Hash-seeded unit vector for `text`.
    pub fn generate(text: &str, dimension: usize) -> Embedding {
        let hash = blake3::hash(text.as_bytes());
        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&hash.as_bytes()[..8]);
        let mut state = u64::from_le_bytes(seed_bytes);

        let mut vec: Embedding = (0..dimension)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 33) % 1000) as f32 / 1000.0 - 0.5
            })
            .collect();

        let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vec.iter_mut().for_each(|x| *x /= norm);
        }
        vec
    }
}

#[async_trait]
impl EmbeddingBackend for MockEmbedder {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Embedding("mock embedder configured to fail".into()));
        }
        texts
            .iter()
            .map(|text| match self.fixed.get(text) {
                Some(v) if v.len() != self.dimension => Err(Error::Embedding(format!(
                    "fixed vector for {} has dimension {}, expected {}",
                    text,
                    v.len(),
                    self.dimension
                ))),
                Some(v) => Ok(v.clone()),
                None => Ok(Self::generate(text, self.dimension)),
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_deterministic() {
        let a = MockEmbedder::generate("커피", 16);
        let b = MockEmbedder::generate("커피", 16);
        let c = MockEmbedder::generate("분위기", 16);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_generate_unit_norm() {
        let v = MockEmbedder::generate("디저트", 32);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_fixed_vectors_and_order() {
        let backend = MockEmbedder::new(2)
            .with_vector("k1", vec![0.0, 0.0])
            .with_vector("k2", vec![1.0, 1.0]);
        let texts = vec!["k2".to_string(), "k1".to_string(), "k3".to_string()];
        let vectors = backend.embed_texts(&texts).await.unwrap();
        assert_eq!(vectors[0], vec![1.0, 1.0]);
        assert_eq!(vectors[1], vec![0.0, 0.0]);
        assert_eq!(vectors[2], MockEmbedder::generate("k3", 2));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fixed_vector_wrong_dimension() {
        let backend = MockEmbedder::new(3).with_vector("k1", vec![1.0]);
        let err = backend.embed_texts(&["k1".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_failing() {
        let backend = MockEmbedder::new(4).failing();
        assert!(backend.embed_texts(&["x".to_string()]).await.is_err());
        assert_eq!(backend.model_name(), "mock");
    }
}
