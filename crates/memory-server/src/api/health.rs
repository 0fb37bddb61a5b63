//! Health and service info endpoints

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::models::{Connections, HealthResponse, QdrantStatus};
use crate::state::AppState;
use crate::{SERVICE_NAME, VERSION};

/// `GET /health`
///
/// Always 200: a missing or unreachable backend reports `degraded` so the
/// container keeps passing liveness checks. A missing backend is reconnected
/// in the background; this response does not wait for it.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = match state.current().await {
        Some(manager) => manager.health_check().await,
        None => {
            state.spawn_reconnect();
            false
        }
    };

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" },
        service: SERVICE_NAME,
        version: VERSION,
        connections: Connections {
            qdrant: QdrantStatus {
                url: state.settings.qdrant_url.clone(),
                status: if connected { "connected" } else { "disconnected" },
            },
            collection: state.settings.collection.clone(),
        },
    })
}

/// `GET /`
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Mem0 Server",
        "version": VERSION,
        "description": "Per-user semantic memory over Qdrant",
        "endpoints": {
            "health": "/health",
            "add_memory": "/memory/add",
            "batch_add_memory": "/memory/batch/add",
            "search_memory": "/memory/search",
            "get_memories": "/memory/{user_id}",
            "update_memory": "/memory/{memory_id}",
            "delete_memory": "/memory/{memory_id}",
            "delete_user_memories": "/memory/user/{user_id}"
        }
    }))
}
