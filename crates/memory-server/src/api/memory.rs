//! ============================================================================
//! Memory endpoints
//! ============================================================================
//! Each handler validates its input, calls the memory manager once (or once
//! per batch item) and shapes the result. Nothing is retried.
//! ============================================================================

use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;
use tracing::info;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::models::{
    BatchMemoryInput, ListQuery, MemoryInput, MemoryListResponse, MemoryUpdate, SearchInput,
    SearchResponse, SearchResult, SuccessResponse,
};
use crate::state::AppState;

/// `POST /memory/add`
pub async fn add_memory(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<MemoryInput>,
) -> Result<Json<SuccessResponse>, ApiError> {
    input.validate()?;
    let manager = state.memory().await?;

    let record = manager
        .add(&input.user_id, &input.content, input.metadata.unwrap_or_default())
        .await
        .map_err(|e| ApiError::from_memory("Failed to add memory", e))?;

    info!("Memory added for user {}: {}", input.user_id, record.id);

    Ok(Json(SuccessResponse::ok(
        "Memory added successfully",
        Some(json!({ "memory_id": record.id.to_string() })),
    )))
}

/// `POST /memory/search`
pub async fn search_memory(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<SearchInput>,
) -> Result<Json<SearchResponse>, ApiError> {
    let limit = input.validate()?;
    let manager = state.memory().await?;

    let hits = manager
        .search(&input.user_id, &input.query, limit)
        .await
        .map_err(|e| ApiError::from_memory("Failed to search memory", e))?;

    info!("Search for user {}: {} results", input.user_id, hits.len());

    let results: Vec<SearchResult> = hits.into_iter().map(SearchResult::from).collect();
    Ok(Json(SearchResponse {
        success: true,
        count: results.len(),
        results,
    }))
}

/// `GET /memory/{user_id}?limit=`
pub async fn get_memories(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<MemoryListResponse>, ApiError> {
    let limit = query.validate()?;
    let manager = state.memory().await?;

    let memories = manager
        .get_all(&user_id, limit)
        .await
        .map_err(|e| ApiError::from_memory("Failed to get memories", e))?;

    info!("Retrieved {} memories for user {}", memories.len(), user_id);

    Ok(Json(MemoryListResponse {
        success: true,
        count: memories.len(),
        memories,
    }))
}

/// `PUT /memory/{memory_id}`
pub async fn update_memory(
    State(state): State<AppState>,
    Path(memory_id): Path<String>,
    ApiJson(input): ApiJson<MemoryUpdate>,
) -> Result<Json<SuccessResponse>, ApiError> {
    input.validate()?;
    let manager = state.memory().await?;

    let record = manager
        .update(&memory_id, input.content.as_deref(), input.metadata)
        .await
        .map_err(|e| ApiError::from_memory("Failed to update memory", e))?;

    Ok(Json(SuccessResponse::ok(
        "Memory updated successfully",
        Some(json!({ "memory_id": record.id.to_string() })),
    )))
}

/// `DELETE /memory/{memory_id}`
pub async fn delete_memory(
    State(state): State<AppState>,
    Path(memory_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let manager = state.memory().await?;

    manager
        .delete(&memory_id)
        .await
        .map_err(|e| ApiError::from_memory("Failed to delete memory", e))?;

    Ok(Json(SuccessResponse::ok("Memory deleted successfully", None)))
}

/// `DELETE /memory/user/{user_id}`
pub async fn delete_user_memories(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let manager = state.memory().await?;

    let deleted_count = manager
        .delete_all(&user_id)
        .await
        .map_err(|e| ApiError::from_memory("Failed to delete memories", e))?;

    Ok(Json(SuccessResponse::ok(
        format!("Deleted {deleted_count} memories"),
        Some(json!({ "deleted_count": deleted_count })),
    )))
}

/// `POST /memory/batch/add`
///
/// Items are added in order; a failing item is reported by index and does
/// not stop the rest.
pub async fn add_memories_batch(
    State(state): State<AppState>,
    ApiJson(batch): ApiJson<BatchMemoryInput>,
) -> Result<Json<SuccessResponse>, ApiError> {
    batch.validate()?;
    let manager = state.memory().await?;

    let mut memory_ids = Vec::new();
    let mut errors = Vec::new();

    for (index, item) in batch.memories.into_iter().enumerate() {
        if let Err(e) = item.validate() {
            errors.push(json!({ "index": index, "error": e.detail() }));
            continue;
        }

        match manager
            .add(&item.user_id, &item.content, item.metadata.unwrap_or_default())
            .await
        {
            Ok(record) => memory_ids.push(record.id.to_string()),
            Err(e) => errors.push(json!({ "index": index, "error": e.to_string() })),
        }
    }

    info!(
        "Batch add: {} successful, {} errors",
        memory_ids.len(),
        errors.len()
    );

    let success = errors.is_empty();
    let mut response = SuccessResponse::ok(
        format!("Added {} memories", memory_ids.len()),
        Some(json!({
            "memory_ids": memory_ids,
            "errors": if success { None } else { Some(errors) },
        })),
    );
    response.success = success;
    Ok(Json(response))
}
