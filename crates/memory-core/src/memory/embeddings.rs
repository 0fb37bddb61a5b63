//! ============================================================================
//! Embedding Service - Vector embeddings for semantic memory search
//! ============================================================================
//! Generates text embeddings through an OpenAI-compatible `/embeddings` API.
//! ============================================================================

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Embedder;
use crate::error::{MemoryError, Result};

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Expected embedding dimension for text-embedding-3-small
pub const EMBEDDING_DIM: usize = 1536;

/// Embedding service for generating text vectors
#[derive(Debug, Clone)]
pub struct EmbeddingService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    model: String,
    usage: Option<EmbeddingUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingUsage {
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl EmbeddingService {
    /// Create an embedding service against the OpenAI API
    pub fn new_openai(api_key: impl Into<String>) -> Self {
        Self::new_custom(api_key, DEFAULT_BASE_URL, DEFAULT_EMBEDDING_MODEL)
    }

    /// Create with custom base URL and model
    pub fn new_custom(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// Get the current model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Embedder for EmbeddingService {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let request = EmbeddingRequest {
            model: &self.model,
            input: &texts,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| MemoryError::Embedding(format!("Failed to send embedding request: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MemoryError::Embedding(format!("Failed to read response body: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|error| error.error.message)
                .unwrap_or(body);
            return Err(MemoryError::Embedding(format!(
                "Embedding API error ({status}): {message}"
            )));
        }

        let embedding_response: EmbeddingResponse = serde_json::from_str(&body).map_err(|e| {
            MemoryError::Embedding(format!("Failed to parse embedding response: {e}"))
        })?;

        if let Some(usage) = &embedding_response.usage {
            debug!(
                "Embedding tokens used: {} (model: {})",
                usage.total_tokens, embedding_response.model
            );
        }

        if embedding_response.data.len() != texts.len() {
            return Err(MemoryError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embedding_response.data.len()
            )));
        }

        // The API may return entries out of order
        let mut data = embedding_response.data;
        data.sort_by_key(|d| d.index);

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_creation() {
        let service = EmbeddingService::new_openai("test-key");
        assert_eq!(service.base_url(), DEFAULT_BASE_URL);
        assert_eq!(service.model(), DEFAULT_EMBEDDING_MODEL);
    }

    #[test]
    fn test_custom_base_url_trailing_slash() {
        let service =
            EmbeddingService::new_custom("k", "http://localhost:8080/v1/", "nomic-embed-text");
        assert_eq!(service.base_url(), "http://localhost:8080/v1");
        assert_eq!(service.model(), "nomic-embed-text");
    }

    #[tokio::test]
    async fn test_empty_input() {
        let service = EmbeddingService::new_openai("test-key");
        let result = service.embed(vec![]).await;
        assert!(result.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_api_is_embedding_error() {
        let service = EmbeddingService::new_custom("k", "http://127.0.0.1:9", "m");
        let err = service.embed_single("hello").await.unwrap_err();
        assert!(matches!(err, MemoryError::Embedding(_)));
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"data":[{"embedding":[0.5],"index":1},{"embedding":[0.1],"index":0}],"model":"m","usage":{"prompt_tokens":2,"total_tokens":2}}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.usage.unwrap().total_tokens, 2);
    }
}
