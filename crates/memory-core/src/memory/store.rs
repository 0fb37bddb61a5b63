//! ============================================================================
//! Memory Store - Qdrant vector database operations
//! ============================================================================
//! Stores and retrieves memories using vector similarity search.
//! ============================================================================

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, Condition,
    CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    GetPointsBuilder, PointId, PointStruct, PointsIdsList, ScrollPointsBuilder,
    SearchPointsBuilder, SetPayloadPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::embeddings::EMBEDDING_DIM;
use super::types::{MemoryRecord, Metadata, ScoredMemory};
use super::VectorStore;
use crate::error::{MemoryError, Result};

/// Default collection name for memories
pub const DEFAULT_COLLECTION: &str = "user_memories";

/// Connection settings for [`QdrantStore`]
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub vector_size: u64,
    pub timeout: Duration,
}

impl QdrantConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            collection: DEFAULT_COLLECTION.to_string(),
            vector_size: EMBEDDING_DIM as u64,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Dimension of the vectors stored in the collection
    pub fn with_vector_size(mut self, vector_size: u64) -> Self {
        self.vector_size = vector_size;
        self
    }
}

/// Memory store backed by Qdrant vector database
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
}

impl QdrantStore {
    /// Connect to Qdrant and make sure the collection exists
    pub async fn connect(config: &QdrantConfig) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", config.url);

        let client = Qdrant::from_url(&config.url)
            .api_key(config.api_key.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| MemoryError::Store(format!("Failed to create Qdrant client: {e}")))?;

        let store = Self {
            client,
            collection: config.collection.clone(),
        };

        store.ensure_collection(config.vector_size).await?;

        Ok(store)
    }

    async fn ensure_collection(&self, vector_size: u64) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| store_err("Failed to check collection existence", e))?;

        if exists {
            debug!("Collection {} already exists", self.collection);
            return Ok(());
        }

        info!("Creating collection: {}", self.collection);

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
            )
            .await
            .map_err(|e| store_err("Failed to create collection", e))?;

        info!("Collection {} created successfully", self.collection);
        Ok(())
    }
}

fn user_filter(user_id: &str) -> Filter {
    Filter::must([Condition::matches("user_id", user_id.to_string())])
}

fn store_err(context: &str, e: impl std::fmt::Display) -> MemoryError {
    MemoryError::Store(format!("{context}: {e}"))
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn upsert(&self, record: &MemoryRecord, embedding: Vec<f32>) -> Result<()> {
        if embedding.is_empty() {
            return Err(MemoryError::InvalidInput(
                "Cannot store memory without embedding".into(),
            ));
        }

        debug!("Storing memory {} for user {}", record.id, record.user_id);

        let payload = Payload::try_from(record.to_payload())
            .map_err(|e| store_err("Failed to build payload", e))?;
        let point = PointStruct::new(record.id.to_string(), embedding, payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
            .await
            .map_err(|e| store_err("Failed to upsert memory", e))?;

        Ok(())
    }

    async fn search(
        &self,
        user_id: &str,
        query_embedding: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<ScoredMemory>> {
        debug!("Searching memories for user {} (limit: {})", user_id, limit);

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query_embedding, limit)
                    .filter(user_filter(user_id))
                    .with_payload(true),
            )
            .await
            .map_err(|e| store_err("Failed to search memories", e))?;

        let hits: Vec<ScoredMemory> = response
            .result
            .into_iter()
            .filter_map(|point| {
                let record = record_from_point(point.id, point.payload)?;
                Some(ScoredMemory::new(record, point.score))
            })
            .collect();

        debug!("Found {} matching memories", hits.len());
        Ok(hits)
    }

    async fn list(&self, user_id: &str, limit: u64) -> Result<Vec<MemoryRecord>> {
        debug!("Getting memories for user {} (limit: {})", user_id, limit);

        let limit = u32::try_from(limit).unwrap_or(u32::MAX);
        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(&self.collection)
                    .filter(user_filter(user_id))
                    .limit(limit)
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await
            .map_err(|e| store_err("Failed to scroll memories", e))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| record_from_point(point.id, point.payload))
            .collect())
    }

    async fn set_payload(&self, record: &MemoryRecord) -> Result<()> {
        debug!("Rewriting payload of memory {}", record.id);

        let payload = Payload::try_from(record.to_payload())
            .map_err(|e| store_err("Failed to build payload", e))?;

        self.client
            .overwrite_payload(
                SetPayloadPointsBuilder::new(&self.collection, payload)
                    .points_selector(PointsIdsList {
                        ids: vec![PointId::from(record.id.to_string())],
                    })
                    .wait(true),
            )
            .await
            .map_err(|e| store_err("Failed to update memory", e))?;

        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<MemoryRecord>> {
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(&self.collection, vec![PointId::from(id.to_string())])
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await
            .map_err(|e| store_err("Failed to get memory", e))?;

        Ok(response
            .result
            .into_iter()
            .find_map(|point| record_from_point(point.id, point.payload)))
    }

    async fn count(&self, user_id: &str) -> Result<u64> {
        let response = self
            .client
            .count(
                CountPointsBuilder::new(&self.collection)
                    .filter(user_filter(user_id))
                    .exact(true),
            )
            .await
            .map_err(|e| store_err("Failed to count memories", e))?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        debug!("Deleting memory {}", id);

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(PointsIdsList {
                        ids: vec![PointId::from(id.to_string())],
                    })
                    .wait(true),
            )
            .await
            .map_err(|e| store_err("Failed to delete memory", e))?;

        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        info!("Deleting all memories for user {}", user_id);

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(user_filter(user_id))
                    .wait(true),
            )
            .await
            .map_err(|e| store_err("Failed to delete memories", e))?;

        Ok(())
    }

    async fn health_check(&self) -> bool {
        match self.client.health_check().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Qdrant health check failed: {}", e);
                false
            }
        }
    }
}

fn record_from_point(
    point_id: Option<PointId>,
    payload: HashMap<String, Value>,
) -> Option<MemoryRecord> {
    let id = extract_uuid_from_point_id(point_id?)?;
    let payload: Metadata = payload
        .into_iter()
        .map(|(key, value)| (key, value_to_json(value)))
        .collect();
    MemoryRecord::from_payload(id, &payload)
}

fn value_to_json(value: Value) -> serde_json::Value {
    use serde_json::Value as Json;

    match value.kind {
        None | Some(Kind::NullValue(_)) => Json::Null,
        Some(Kind::BoolValue(b)) => Json::Bool(b),
        Some(Kind::IntegerValue(i)) => Json::from(i),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Some(Kind::StringValue(s)) => Json::String(s),
        Some(Kind::ListValue(list)) => {
            Json::Array(list.values.into_iter().map(value_to_json).collect())
        }
        Some(Kind::StructValue(st)) => Json::Object(
            st.fields
                .into_iter()
                .map(|(key, value)| (key, value_to_json(value)))
                .collect(),
        ),
    }
}

// Points are always written with UUID ids
fn extract_uuid_from_point_id(point_id: PointId) -> Option<Uuid> {
    match point_id.point_id_options? {
        PointIdOptions::Uuid(uuid_str) => Uuid::parse_str(&uuid_str).ok(),
        PointIdOptions::Num(_) => None,
    }
}
