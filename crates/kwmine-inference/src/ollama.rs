//! Ollama embedding backend implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use kwmine_core::{Embedding, EmbeddingBackend, Error, Result};

/// Default Ollama endpoint.
pub const DEFAULT_EMBED_URL: &str = kwmine_core::defaults::EMBED_URL;

/// Default embedding model.
pub const DEFAULT_EMBED_MODEL: &str = kwmine_core::defaults::EMBED_MODEL;

/// Default embedding dimension for bge-m3.
pub const DEFAULT_DIMENSION: usize = kwmine_core::defaults::EMBED_DIMENSION;

/// Embedding calls slower than this are logged at warn.
const SLOW_EMBED_MS: u64 = 5000;

/// Ollama embedding backend.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
    timeout_secs: u64,
    batch_size: usize,
}

impl OllamaEmbedder {
    /// Create a backend with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config(
            DEFAULT_EMBED_URL.to_string(),
            DEFAULT_EMBED_MODEL.to_string(),
            DEFAULT_DIMENSION,
        )
    }

    /// Create a backend with a custom endpoint, model and dimension.
    pub fn with_config(base_url: String, model: String, dimension: usize) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        info!(
            subsystem = "inference",
            component = "ollama",
            url = %base_url,
            model = %model,
            dimension,
            "Initializing Ollama embedder"
        );

        Ok(Self {
            client,
            base_url,
            model,
            dimension,
            timeout_secs: kwmine_core::defaults::EMBED_TIMEOUT_SECS,
            batch_size: kwmine_core::defaults::EMBED_BATCH_SIZE,
        })
    }

    /// Create from environment variables.
    ///
    /// - `KWMINE_EMBED_URL`
    /// - `KWMINE_EMBED_MODEL`
    /// - `KWMINE_EMBED_DIM`
    /// - `KWMINE_EMBED_TIMEOUT_SECS`
    /// - `KWMINE_EMBED_BATCH_SIZE`
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("KWMINE_EMBED_URL").unwrap_or_else(|_| DEFAULT_EMBED_URL.to_string());
        let model =
            std::env::var("KWMINE_EMBED_MODEL").unwrap_or_else(|_| DEFAULT_EMBED_MODEL.to_string());
        let dimension = std::env::var("KWMINE_EMBED_DIM")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DIMENSION);
        let timeout_secs = std::env::var("KWMINE_EMBED_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(kwmine_core::defaults::EMBED_TIMEOUT_SECS);
        let batch_size = std::env::var("KWMINE_EMBED_BATCH_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(kwmine_core::defaults::EMBED_BATCH_SIZE);

        Ok(Self::with_config(base_url, model, dimension)?
            .with_timeout_secs(timeout_secs)
            .with_batch_size(batch_size))
    }

    /// Per-request timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs.max(1);
        self
    }

    /// Maximum texts per request. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse response: {}", e)))?;

        if result.embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                result.embeddings.len()
            )));
        }
        if let Some(bad) = result
            .embeddings
            .iter()
            .find(|v| v.len() != self.dimension)
        {
            return Err(Error::Embedding(format!(
                "Expected dimension {}, got {}",
                self.dimension,
                bad.len()
            )));
        }

        Ok(result.embeddings)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingBackend for OllamaEmbedder {
    #[instrument(skip(self, texts), fields(subsystem = "inference", component = "ollama", op = "embed_texts", model = %self.model, input_count = texts.len()))]
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let start = Instant::now();
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        let elapsed = start.elapsed().as_millis() as u64;

        debug!(
            result_count = vectors.len(),
            batches = texts.len().div_ceil(self.batch_size),
            duration_ms = elapsed,
            "Embedding complete"
        );
        if elapsed > SLOW_EMBED_MS {
            warn!(
                duration_ms = elapsed,
                input_count = texts.len(),
                slow = true,
                "Slow embedding operation"
            );
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let backend = OllamaEmbedder::new().unwrap();
        assert_eq!(backend.model_name(), DEFAULT_EMBED_MODEL);
        assert_eq!(backend.dimension(), DEFAULT_DIMENSION);
        assert_eq!(backend.base_url(), DEFAULT_EMBED_URL);
        assert_eq!(backend.batch_size(), kwmine_core::defaults::EMBED_BATCH_SIZE);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let backend =
            OllamaEmbedder::with_config("http://host:11434/".into(), "m".into(), 8).unwrap();
        assert_eq!(backend.base_url(), "http://host:11434");
    }

    #[test]
    fn test_batch_size_floor() {
        let backend = OllamaEmbedder::new().unwrap().with_batch_size(0);
        assert_eq!(backend.batch_size(), 1);
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_request() {
        let backend =
            OllamaEmbedder::with_config("http://127.0.0.1:1".into(), "m".into(), 8).unwrap();
        let vectors = backend.embed_texts(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[test]
    fn test_request_serialization() {
        let input = vec!["커피".to_string(), "분위기".to_string()];
        let request = EmbeddingRequest {
            model: "bge-m3",
            input: &input,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "bge-m3");
        assert_eq!(json["input"][1], "분위기");
    }
}
