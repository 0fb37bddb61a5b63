//! ============================================================================
//! Memory Types - Data structures for per-user memory
//! ============================================================================
//! Defines memory records, scored search hits, and their vector-store payload.
//! ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Open key-value metadata attached to a memory
pub type Metadata = serde_json::Map<String, Value>;

/// A single memory entry stored in the vector database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique identifier (also the vector point id)
    pub id: Uuid,
    /// Isolation key: every query is filtered on it
    pub user_id: String,
    /// The remembered text
    #[serde(rename = "memory")]
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    /// `null` until the record is first updated
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MemoryRecord {
    /// Create a new memory with a fresh id
    pub fn new(user_id: impl Into<String>, content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            content: content.into(),
            metadata,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Vector-store payload for this record (everything except the id)
    pub fn to_payload(&self) -> Value {
        let mut payload = json!({
            "user_id": self.user_id,
            "memory": self.content,
            "metadata": Value::Object(self.metadata.clone()),
            "created_at": self.created_at.to_rfc3339(),
        });
        if let Some(updated_at) = self.updated_at {
            payload["updated_at"] = Value::String(updated_at.to_rfc3339());
        }
        payload
    }

    /// Rebuild a record from a stored payload.
    ///
    /// Returns `None` when the payload lacks `user_id` or `memory`; points
    /// written by other tools into the same collection are skipped that way.
    pub fn from_payload(id: Uuid, payload: &Metadata) -> Option<Self> {
        let user_id = payload.get("user_id")?.as_str()?.to_string();
        let content = payload.get("memory")?.as_str()?.to_string();
        let metadata = match payload.get("metadata") {
            Some(Value::Object(map)) => map.clone(),
            _ => Metadata::new(),
        };
        let created_at = payload
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);
        let updated_at = payload
            .get("updated_at")
            .and_then(Value::as_str)
            .and_then(parse_timestamp);

        Some(Self {
            id,
            user_id,
            content,
            metadata,
            created_at,
            updated_at,
        })
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// A memory returned by similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMemory {
    #[serde(flatten)]
    pub record: MemoryRecord,
    /// Cosine similarity, clamped to [0, 1]
    pub score: f32,
}

impl ScoredMemory {
    pub fn new(record: MemoryRecord, score: f32) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self { record, score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(pairs: &[(&str, Value)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_record_creation() {
        let record = MemoryRecord::new("u1", "User prefers Python", Metadata::new());
        assert_eq!(record.user_id, "u1");
        assert_eq!(record.content, "User prefers Python");
        assert!(record.metadata.is_empty());
        assert!(record.updated_at.is_none());
    }

    #[test]
    fn test_payload_keeps_nested_metadata() {
        let record = MemoryRecord::new(
            "u1",
            "Lives in Lisbon",
            metadata(&[("source", json!("chat")), ("tags", json!(["home", "city"]))]),
        );

        let Value::Object(payload) = record.to_payload() else {
            panic!("payload must be an object");
        };
        assert!(!payload.contains_key("updated_at"));

        let restored = MemoryRecord::from_payload(record.id, &payload).unwrap();
        assert_eq!(restored.content, "Lives in Lisbon");
        assert_eq!(restored.metadata["tags"], json!(["home", "city"]));
        assert_eq!(restored.created_at.timestamp(), record.created_at.timestamp());
    }

    #[test]
    fn test_foreign_payload_is_skipped() {
        let payload = metadata(&[("content", json!("written by another tool"))]);
        assert!(MemoryRecord::from_payload(Uuid::new_v4(), &payload).is_none());
    }

    #[test]
    fn test_score_clamped() {
        let record = MemoryRecord::new("u1", "x", Metadata::new());
        assert_eq!(ScoredMemory::new(record.clone(), -0.2).score, 0.0);
        assert_eq!(ScoredMemory::new(record.clone(), 1.000_01).score, 1.0);
        assert_eq!(ScoredMemory::new(record, f32::NAN).score, 0.0);
    }

    #[test]
    fn test_record_serializes_content_as_memory() {
        let record = MemoryRecord::new("u1", "Likes tea", Metadata::new());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["memory"], "Likes tea");
        assert!(json.get("content").is_none());
        assert!(json["updated_at"].is_null());
    }
}
