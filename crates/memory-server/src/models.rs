//! ============================================================================
//! Request / response bodies
//! ============================================================================

use memory_core::memory::{MAX_CONTENT_CHARS, MAX_USER_ID_CHARS};
use memory_core::{MemoryRecord, Metadata, ScoredMemory};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Default number of search results
pub const DEFAULT_SEARCH_LIMIT: i64 = 5;

/// Largest accepted search limit
pub const MAX_SEARCH_LIMIT: i64 = 100;

/// Default number of memories listed per user
pub const DEFAULT_LIST_LIMIT: i64 = 100;

/// Largest accepted query, in characters
pub const MAX_QUERY_CHARS: usize = 500;

/// Largest accepted batch
pub const MAX_BATCH_SIZE: usize = 50;

// ============================================================================
// Requests
// ============================================================================

/// Body of `POST /memory/add`
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryInput {
    pub content: String,
    pub user_id: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl MemoryInput {
    pub fn validate(&self) -> Result<(), ApiError> {
        require_text("content", &self.content, MAX_CONTENT_CHARS)?;
        require_text("user_id", &self.user_id, MAX_USER_ID_CHARS)
    }
}

/// Body of `POST /memory/search`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchInput {
    pub query: String,
    pub user_id: String,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

fn default_search_limit() -> i64 {
    DEFAULT_SEARCH_LIMIT
}

impl SearchInput {
    pub fn validate(&self) -> Result<u64, ApiError> {
        require_text("query", &self.query, MAX_QUERY_CHARS)?;
        require_text("user_id", &self.user_id, MAX_USER_ID_CHARS)?;
        if !(1..=MAX_SEARCH_LIMIT).contains(&self.limit) {
            return Err(ApiError::Validation(format!(
                "limit: must be between 1 and {MAX_SEARCH_LIMIT}"
            )));
        }
        Ok(self.limit.unsigned_abs())
    }
}

/// Query string of `GET /memory/{user_id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

impl ListQuery {
    pub fn validate(&self) -> Result<u64, ApiError> {
        let limit = self.limit.unwrap_or(DEFAULT_LIST_LIMIT);
        if limit < 1 {
            return Err(ApiError::Validation("limit: must be at least 1".into()));
        }
        Ok(limit.unsigned_abs())
    }
}

/// Body of `PUT /memory/{memory_id}`
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryUpdate {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl MemoryUpdate {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.content.is_none() && self.metadata.is_none() {
            return Err(ApiError::Validation(
                "content or metadata must be provided".into(),
            ));
        }
        if let Some(content) = &self.content {
            require_text("content", content, MAX_CONTENT_CHARS)?;
        }
        Ok(())
    }
}

/// Body of `POST /memory/batch/add`
#[derive(Debug, Clone, Deserialize)]
pub struct BatchMemoryInput {
    pub memories: Vec<MemoryInput>,
}

impl BatchMemoryInput {
    /// Checks the envelope only; items are validated one by one
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.memories.is_empty() || self.memories.len() > MAX_BATCH_SIZE {
            return Err(ApiError::Validation(format!(
                "memories: must contain between 1 and {MAX_BATCH_SIZE} items"
            )));
        }
        Ok(())
    }
}

fn require_text(field: &str, value: &str, max_chars: usize) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{field}: must not be empty")));
    }
    if value.chars().count() > max_chars {
        return Err(ApiError::Validation(format!(
            "{field}: must be at most {max_chars} characters"
        )));
    }
    Ok(())
}

// ============================================================================
// Responses
// ============================================================================

/// Generic success envelope
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<Value>,
}

impl SuccessResponse {
    pub fn ok(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

/// Single search hit
#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub memory: String,
    pub score: f32,
    pub metadata: Option<Metadata>,
    pub memory_id: String,
}

impl From<ScoredMemory> for SearchResult {
    fn from(hit: ScoredMemory) -> Self {
        Self {
            memory: hit.record.content,
            score: hit.score,
            metadata: Some(hit.record.metadata),
            memory_id: hit.record.id.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub results: Vec<SearchResult>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct MemoryListResponse {
    pub success: bool,
    pub memories: Vec<MemoryRecord>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct QdrantStatus {
    pub url: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Connections {
    pub qdrant: QdrantStatus,
    pub collection: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub connections: Connections,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_defaults_and_bounds() {
        let input: SearchInput =
            serde_json::from_str(r#"{"query":"q","user_id":"u1"}"#).unwrap();
        assert_eq!(input.validate().unwrap(), 5);

        let input: SearchInput =
            serde_json::from_str(r#"{"query":"q","user_id":"u1","limit":0}"#).unwrap();
        assert!(input.validate().is_err());

        let input: SearchInput =
            serde_json::from_str(r#"{"query":"q","user_id":"u1","limit":101}"#).unwrap();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_memory_input_validation() {
        let input: MemoryInput =
            serde_json::from_str(r#"{"content":"hi","user_id":"u1"}"#).unwrap();
        assert!(input.validate().is_ok());
        assert!(input.metadata.is_none());

        let input: MemoryInput =
            serde_json::from_str(r#"{"content":"","user_id":"u1"}"#).unwrap();
        assert!(input.validate().is_err());

        let long_user = "u".repeat(MAX_USER_ID_CHARS + 1);
        let input = MemoryInput {
            content: "hi".into(),
            user_id: long_user,
            metadata: None,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_non_object_metadata_rejected() {
        let parsed = serde_json::from_str::<MemoryInput>(
            r#"{"content":"hi","user_id":"u1","metadata":"tag"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_list_limit() {
        assert_eq!(ListQuery::default().validate().unwrap(), 100);
        assert!(ListQuery { limit: Some(0) }.validate().is_err());
        assert_eq!(ListQuery { limit: Some(7) }.validate().unwrap(), 7);
    }

    #[test]
    fn test_update_requires_a_field() {
        let update = MemoryUpdate {
            content: None,
            metadata: None,
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_batch_bounds() {
        let empty = BatchMemoryInput { memories: vec![] };
        assert!(empty.validate().is_err());

        let item = MemoryInput {
            content: "c".into(),
            user_id: "u".into(),
            metadata: None,
        };
        let full = BatchMemoryInput {
            memories: vec![item; MAX_BATCH_SIZE + 1],
        };
        assert!(full.validate().is_err());
    }
}
