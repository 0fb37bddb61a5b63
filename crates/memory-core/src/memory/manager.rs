//! ============================================================================
//! Memory Manager - Orchestrates memory storage and retrieval
//! ============================================================================
//! High-level API for storing, searching, and managing per-user memory.
//! ============================================================================

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use super::embeddings::EmbeddingService;
use super::store::{QdrantConfig, QdrantStore};
use super::types::{MemoryRecord, Metadata, ScoredMemory};
use super::{Embedder, VectorStore};
use crate::error::{MemoryError, Result};

/// Longest accepted memory content, in characters
pub const MAX_CONTENT_CHARS: usize = 10_000;

/// Longest accepted user id, in characters
pub const MAX_USER_ID_CHARS: usize = 100;

/// Memory manager combining store and embeddings
#[derive(Clone)]
pub struct MemoryManager {
    store: Arc<dyn VectorStore>,
    embeddings: Arc<dyn Embedder>,
}

impl std::fmt::Debug for MemoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryManager")
            .field("collection", &self.store.collection())
            .finish_non_exhaustive()
    }
}

impl MemoryManager {
    pub fn new(store: Arc<dyn VectorStore>, embeddings: Arc<dyn Embedder>) -> Self {
        Self { store, embeddings }
    }

    /// Connect to Qdrant and build a manager around the OpenAI embedder
    pub async fn connect(config: &QdrantConfig, embeddings: EmbeddingService) -> Result<Self> {
        let store = QdrantStore::connect(config).await?;
        Ok(Self::new(Arc::new(store), Arc::new(embeddings)))
    }

    /// Collection the memories live in
    pub fn collection(&self) -> &str {
        self.store.collection()
    }

    /// Store a new memory with auto-generated embedding
    pub async fn add(
        &self,
        user_id: &str,
        content: &str,
        metadata: Metadata,
    ) -> Result<MemoryRecord> {
        validate_user_id(user_id)?;
        validate_content(content)?;

        let embedding = self.embeddings.embed_single(content).await?;

        let record = MemoryRecord::new(user_id, content, metadata);
        self.store.upsert(&record, embedding).await?;

        info!("Stored memory {} for user {}", record.id, user_id);
        Ok(record)
    }

    /// Search memories by semantic similarity, best match first
    pub async fn search(
        &self,
        user_id: &str,
        query: &str,
        limit: u64,
    ) -> Result<Vec<ScoredMemory>> {
        validate_user_id(user_id)?;
        if query.trim().is_empty() {
            return Err(MemoryError::InvalidInput("query must not be empty".into()));
        }
        if limit == 0 {
            return Ok(vec![]);
        }

        debug!("Searching memories for user {} with query: {}", user_id, query);

        let query_embedding = self.embeddings.embed_single(query).await?;

        let mut hits = self.store.search(user_id, query_embedding, limit).await?;
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(hits)
    }

    /// Get memories for a user (non-semantic)
    pub async fn get_all(&self, user_id: &str, limit: u64) -> Result<Vec<MemoryRecord>> {
        if limit == 0 {
            return Ok(vec![]);
        }
        self.store.list(user_id, limit).await
    }

    /// Look up a single memory; unknown or malformed ids yield `None`
    pub async fn get(&self, memory_id: &str) -> Result<Option<MemoryRecord>> {
        match Uuid::parse_str(memory_id) {
            Ok(id) => self.store.get(&id).await,
            Err(_) => Ok(None),
        }
    }

    /// Replace the content and/or metadata of an existing memory.
    ///
    /// Only a content change is re-embedded.
    pub async fn update(
        &self,
        memory_id: &str,
        content: Option<&str>,
        metadata: Option<Metadata>,
    ) -> Result<MemoryRecord> {
        if let Some(content) = content {
            validate_content(content)?;
        }

        let mut record = self
            .get(memory_id)
            .await?
            .ok_or_else(|| MemoryError::NotFound(memory_id.to_string()))?;

        if let Some(metadata) = metadata {
            record.metadata = metadata;
        }
        record.updated_at = Some(Utc::now());

        match content {
            Some(content) => {
                record.content = content.to_string();
                let embedding = self.embeddings.embed_single(&record.content).await?;
                self.store.upsert(&record, embedding).await?;
            }
            None => self.store.set_payload(&record).await?,
        }

        info!("Updated memory {}", record.id);
        Ok(record)
    }

    /// Delete a specific memory; `NotFound` when it does not exist
    pub async fn delete(&self, memory_id: &str) -> Result<()> {
        let record = self
            .get(memory_id)
            .await?
            .ok_or_else(|| MemoryError::NotFound(memory_id.to_string()))?;

        self.store.delete(&record.id).await?;

        info!("Memory deleted: {}", record.id);
        Ok(())
    }

    /// Delete all memories for a user, returning how many there were
    pub async fn delete_all(&self, user_id: &str) -> Result<u64> {
        let count = self.store.count(user_id).await?;
        if count > 0 {
            self.store.delete_user(user_id).await?;
        }

        info!("Deleted {} memories for user {}", count, user_id);
        Ok(count)
    }

    /// Check if the memory system is healthy
    pub async fn health_check(&self) -> bool {
        self.store.health_check().await
    }
}

fn validate_user_id(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(MemoryError::InvalidInput("user_id must not be empty".into()));
    }
    if user_id.chars().count() > MAX_USER_ID_CHARS {
        return Err(MemoryError::InvalidInput(format!(
            "user_id must be at most {MAX_USER_ID_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(MemoryError::InvalidInput("content must not be empty".into()));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(MemoryError::InvalidInput(format!(
            "content must be at most {MAX_CONTENT_CHARS} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryVectorStore, KeywordEmbedder};
    use serde_json::json;

    fn manager() -> MemoryManager {
        MemoryManager::new(
            Arc::new(InMemoryVectorStore::new("test")),
            Arc::new(KeywordEmbedder::default()),
        )
    }

    #[tokio::test]
    async fn test_add_and_search() {
        let manager = manager();
        let added = manager
            .add("u1", "User prefers Python", Metadata::new())
            .await
            .unwrap();
        manager
            .add("u1", "Lives near the ocean", Metadata::new())
            .await
            .unwrap();

        let hits = manager.search("u1", "python language", 5).await.unwrap();
        assert_eq!(hits[0].record.id, added.id);
        assert!((0.0..=1.0).contains(&hits[0].score));
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_search_respects_limit_and_user() {
        let manager = manager();
        for i in 0..6 {
            manager
                .add("u1", &format!("note number {i}"), Metadata::new())
                .await
                .unwrap();
        }
        manager.add("u2", "note from u2", Metadata::new()).await.unwrap();

        let hits = manager.search("u1", "note", 3).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| h.record.user_id == "u1"));

        assert!(manager.search("u1", "note", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_rejects_empty_fields() {
        let manager = manager();
        let err = manager.add("", "content", Metadata::new()).await.unwrap_err();
        assert!(matches!(err, MemoryError::InvalidInput(_)));

        let err = manager.add("u1", "   ", Metadata::new()).await.unwrap_err();
        assert!(matches!(err, MemoryError::InvalidInput(_)));

        let long = "x".repeat(MAX_CONTENT_CHARS + 1);
        let err = manager.add("u1", &long, Metadata::new()).await.unwrap_err();
        assert!(matches!(err, MemoryError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_then_not_found() {
        let manager = manager();
        let record = manager.add("u1", "temporary", Metadata::new()).await.unwrap();
        let id = record.id.to_string();

        manager.delete(&id).await.unwrap();
        assert!(manager.get_all("u1", 100).await.unwrap().is_empty());

        let err = manager.delete(&id).await.unwrap_err();
        assert_eq!(err, MemoryError::NotFound(id));

        let err = manager.delete("not-a-uuid").await.unwrap_err();
        assert!(matches!(err, MemoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_all_counts() {
        let manager = manager();
        manager.add("u1", "one", Metadata::new()).await.unwrap();
        manager.add("u1", "two", Metadata::new()).await.unwrap();
        manager.add("u2", "three", Metadata::new()).await.unwrap();

        assert_eq!(manager.delete_all("u1").await.unwrap(), 2);
        assert_eq!(manager.delete_all("u1").await.unwrap(), 0);
        assert_eq!(manager.get_all("u2", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_content_and_metadata() {
        let manager = manager();
        let record = manager
            .add("u1", "likes coffee", Metadata::new())
            .await
            .unwrap();

        let metadata: Metadata = [("source".to_string(), json!("profile"))].into_iter().collect();
        let updated = manager
            .update(&record.id.to_string(), Some("likes tea"), Some(metadata))
            .await
            .unwrap();
        assert_eq!(updated.content, "likes tea");
        assert_eq!(updated.metadata["source"], "profile");
        assert!(updated.updated_at.is_some());

        let hits = manager.search("u1", "tea", 1).await.unwrap();
        assert_eq!(hits[0].record.content, "likes tea");

        let err = manager
            .update(&Uuid::new_v4().to_string(), Some("x"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_metadata_update_keeps_embedding() {
        let embedder = KeywordEmbedder::default();
        let manager = MemoryManager::new(
            Arc::new(InMemoryVectorStore::new("test")),
            Arc::new(embedder.clone()),
        );
        let record = manager.add("u1", "likes coffee", Metadata::new()).await.unwrap();
        assert_eq!(embedder.calls(), 1);

        let metadata: Metadata = [("pinned".to_string(), json!(true))].into_iter().collect();
        let updated = manager
            .update(&record.id.to_string(), None, Some(metadata))
            .await
            .unwrap();
        assert_eq!(embedder.calls(), 1);
        assert_eq!(updated.content, "likes coffee");
        assert!(updated.updated_at.is_some());

        // Stored record changed, vector still matches the old content
        let hits = manager.search("u1", "coffee", 1).await.unwrap();
        assert_eq!(hits[0].record.metadata["pinned"], true);
        assert!(hits[0].score > 0.0);

        manager
            .update(&record.id.to_string(), Some("likes tea"), None)
            .await
            .unwrap();
        assert_eq!(embedder.calls(), 3);
    }

    #[tokio::test]
    async fn test_health_check() {
        let store = Arc::new(InMemoryVectorStore::new("test"));
        let manager = MemoryManager::new(store.clone(), Arc::new(KeywordEmbedder::default()));
        assert!(manager.health_check().await);

        store.set_available(false);
        assert!(!manager.health_check().await);
        let err = manager.add("u1", "x", Metadata::new()).await.unwrap_err();
        assert!(matches!(err, MemoryError::Store(_)));
    }
}
