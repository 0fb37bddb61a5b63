//! ============================================================================
//! In-process backends
//! ============================================================================
//! Deterministic stand-ins for the embeddings API and Qdrant, used by tests
//! and local runs without external services.
//! ============================================================================

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{MemoryError, Result};
use crate::memory::{Embedder, MemoryRecord, ScoredMemory, VectorStore};

/// Bag-of-words embedder: each word stem is hashed into one of `dim` buckets
/// and the result is L2-normalised, so texts sharing words score higher.
#[derive(Debug, Clone)]
pub struct KeywordEmbedder {
    dim: usize,
    // Shared between clones
    calls: Arc<AtomicUsize>,
}

/// Words are truncated to this many characters, so "prefers" and
/// "preferred" land in the same bucket.
const STEM_CHARS: usize = 5;

impl KeywordEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim: dim.max(1),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `embed` calls served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dim];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let stem: String = word.to_lowercase().chars().take(STEM_CHARS).collect();
            let mut hasher = DefaultHasher::new();
            stem.hash(&mut hasher);
            let bucket = (hasher.finish() % self.dim as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl Default for KeywordEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Vector store kept in a process-local map, searched by brute-force cosine
/// similarity.
#[derive(Debug)]
pub struct InMemoryVectorStore {
    collection: String,
    points: RwLock<HashMap<Uuid, (MemoryRecord, Vec<f32>)>>,
    available: AtomicBool,
}

impl InMemoryVectorStore {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            points: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the backend going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(MemoryError::Store("Vector store unavailable".into()))
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn upsert(&self, record: &MemoryRecord, embedding: Vec<f32>) -> Result<()> {
        self.check_available()?;
        if embedding.is_empty() {
            return Err(MemoryError::InvalidInput(
                "Cannot store memory without embedding".into(),
            ));
        }
        self.points
            .write()
            .await
            .insert(record.id, (record.clone(), embedding));
        Ok(())
    }

    async fn search(
        &self,
        user_id: &str,
        query_embedding: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<ScoredMemory>> {
        self.check_available()?;
        let points = self.points.read().await;

        let mut hits: Vec<ScoredMemory> = points
            .values()
            .filter(|(record, _)| record.user_id == user_id)
            .map(|(record, vector)| {
                ScoredMemory::new(record.clone(), cosine_similarity(&query_embedding, vector))
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(hits)
    }

    async fn list(&self, user_id: &str, limit: u64) -> Result<Vec<MemoryRecord>> {
        self.check_available()?;
        let points = self.points.read().await;

        let mut records: Vec<MemoryRecord> = points
            .values()
            .filter(|(record, _)| record.user_id == user_id)
            .map(|(record, _)| record.clone())
            .collect();

        records.sort_by_key(|r| r.created_at);
        records.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(records)
    }

    async fn set_payload(&self, record: &MemoryRecord) -> Result<()> {
        self.check_available()?;
        match self.points.write().await.get_mut(&record.id) {
            Some((stored, _)) => {
                *stored = record.clone();
                Ok(())
            }
            None => Err(MemoryError::Store(format!("No point with id {}", record.id))),
        }
    }

    async fn get(&self, id: &Uuid) -> Result<Option<MemoryRecord>> {
        self.check_available()?;
        Ok(self
            .points
            .read()
            .await
            .get(id)
            .map(|(record, _)| record.clone()))
    }

    async fn count(&self, user_id: &str) -> Result<u64> {
        self.check_available()?;
        let points = self.points.read().await;
        Ok(points
            .values()
            .filter(|(record, _)| record.user_id == user_id)
            .count() as u64)
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        self.check_available()?;
        self.points.write().await.remove(id);
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        self.check_available()?;
        self.points
            .write()
            .await
            .retain(|_, (record, _)| record.user_id != user_id);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}
