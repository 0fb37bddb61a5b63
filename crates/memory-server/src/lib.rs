//! mem0 server: REST API for per-user semantic memory.

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod state;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub use config::Settings;
pub use error::ApiError;
pub use state::{AppState, MemoryConnector, QdrantConnector};

/// Service name reported by `/health`
pub const SERVICE_NAME: &str = "mem0-server";

/// Service version reported by `/health`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let settings = Arc::clone(&state.settings);
    with_layers(api::router(state), &settings)
}

/// Wrap `router` in panic recovery, CORS and request tracing
pub fn with_layers(router: Router, settings: &Settings) -> Router {
    let debug = settings.debug;
    let cors = cors_layer(settings);

    router
        .layer(CatchPanicLayer::custom(
            move |panic: Box<dyn std::any::Any + Send + 'static>| {
                error::panic_response(panic, debug)
            },
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let Some(origins) = settings.cors_origin_list() else {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    };

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    // Credentials cannot be combined with wildcards, so mirror the request
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
