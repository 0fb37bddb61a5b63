//! ============================================================================
//! Memory Module - Per-user semantic memory
//! ============================================================================
//! Vector-based memory storage using Qdrant for semantic search.
//!
//! ## Architecture
//! ```text
//! content ──▶ Embedder ──▶ vector ──▶ VectorStore (payload.user_id filter)
//!                                            │
//! query ───▶ Embedder ──▶ vector ──▶ nearest neighbours ──▶ ScoredMemory
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use memory_core::memory::{EmbeddingService, MemoryManager, QdrantConfig};
//!
//! let embeddings = EmbeddingService::new_openai(api_key);
//! let manager = MemoryManager::connect(&QdrantConfig::new(url), embeddings).await?;
//!
//! let record = manager.add("u1", "User prefers Python", Default::default()).await?;
//! let hits = manager.search("u1", "preferred language", 5).await?;
//! ```
//! ============================================================================

mod embeddings;
mod manager;
mod store;
mod types;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{MemoryError, Result};

// Re-export public types
pub use embeddings::{EmbeddingService, DEFAULT_BASE_URL, DEFAULT_EMBEDDING_MODEL, EMBEDDING_DIM};
pub use manager::{MemoryManager, MAX_CONTENT_CHARS, MAX_USER_ID_CHARS};
pub use store::{QdrantConfig, QdrantStore, DEFAULT_COLLECTION};
pub use types::{MemoryRecord, Metadata, ScoredMemory};

/// Converts text into vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed several texts, one vector per input, in input order
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MemoryError::Embedding("No embedding returned".into()))
    }
}

/// Vector storage for memory records, always scoped by user
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Name of the underlying collection
    fn collection(&self) -> &str;

    /// Insert or replace a record with its embedding
    async fn upsert(&self, record: &MemoryRecord, embedding: Vec<f32>) -> Result<()>;

    /// Nearest neighbours of `query_embedding` among the user's records,
    /// best first, at most `limit`
    async fn search(
        &self,
        user_id: &str,
        query_embedding: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<ScoredMemory>>;

    /// Up to `limit` records belonging to the user
    async fn list(&self, user_id: &str, limit: u64) -> Result<Vec<MemoryRecord>>;

    /// Replace the stored fields of an existing record, keeping its vector
    async fn set_payload(&self, record: &MemoryRecord) -> Result<()>;

    async fn get(&self, id: &Uuid) -> Result<Option<MemoryRecord>>;

    /// Number of records belonging to the user
    async fn count(&self, user_id: &str) -> Result<u64>;

    async fn delete(&self, id: &Uuid) -> Result<()>;

    /// Remove every record belonging to the user
    async fn delete_user(&self, user_id: &str) -> Result<()>;

    /// Whether the backend answers; never fails
    async fn health_check(&self) -> bool;
}
