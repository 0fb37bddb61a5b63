//! HTTP routes

mod health;
mod memory;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/memory/add", post(memory::add_memory))
        .route("/memory/search", post(memory::search_memory))
        .route("/memory/batch/add", post(memory::add_memories_batch))
        .route("/memory/user/{user_id}", delete(memory::delete_user_memories))
        // One route: GET takes a user id, PUT/DELETE a memory id
        .route(
            "/memory/{id}",
            get(memory::get_memories)
                .put(memory::update_memory)
                .delete(memory::delete_memory),
        )
        .with_state(state)
}
