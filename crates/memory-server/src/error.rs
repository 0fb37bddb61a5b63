//! ============================================================================
//! API errors
//! ============================================================================
//! Every failure leaves the server as `{success: false, error, detail}`.
//! ============================================================================

use std::any::Any;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use memory_core::MemoryError;
use serde::Serialize;
use tracing::{error, warn};

/// Error body returned for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub detail: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Body is not JSON, or not labelled as JSON
    #[error("Invalid request body")]
    BadRequest(String),

    /// Body or query parsed but fields are missing or out of range
    #[error("Validation error")]
    Validation(String),

    #[error("Memory not found")]
    NotFound(String),

    /// No memory backend connected
    #[error("Memory service not initialized")]
    Unavailable(String),

    /// Embeddings API or vector store failed
    #[error("{context}")]
    Upstream { context: &'static str, detail: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            ApiError::BadRequest(detail)
            | ApiError::Validation(detail)
            | ApiError::NotFound(detail)
            | ApiError::Unavailable(detail)
            | ApiError::Upstream { detail, .. } => detail,
        }
    }

    /// Map a backend error, labelling upstream failures with `context`
    /// (e.g. "Failed to add memory")
    pub fn from_memory(context: &'static str, err: MemoryError) -> Self {
        match err {
            MemoryError::NotFound(id) => ApiError::NotFound(format!("Memory not found: {id}")),
            MemoryError::InvalidInput(msg) => ApiError::Validation(msg),
            MemoryError::Embedding(_) | MemoryError::Store(_) => ApiError::Upstream {
                context,
                detail: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}: {}", self, self.detail());
        } else {
            warn!("{}: {}", self, self.detail());
        }

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            detail: Some(self.detail().to_string()),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::UNPROCESSABLE_ENTITY {
            ApiError::Validation(rejection.body_text())
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

/// Response for a handler that panicked. The panic message is only exposed
/// when `debug` is set.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>, debug: bool) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Unhandled exception: {}", message);

    let body = ErrorResponse {
        success: false,
        error: "Internal server error".to_string(),
        detail: debug.then_some(message),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_error_mapping() {
        let err = ApiError::from_memory("Failed to delete memory", MemoryError::NotFound("x".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = ApiError::from_memory("Failed to add memory", MemoryError::InvalidInput("bad".into()));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = ApiError::from_memory("Failed to add memory", MemoryError::Store("down".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Failed to add memory");
        assert_eq!(err.detail(), "Vector store error: down");
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_panic_detail_hidden_without_debug() {
        let response = panic_response(Box::new("boom"), false);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Internal server error");
        assert!(body["detail"].is_null());
    }

    #[tokio::test]
    async fn test_panic_detail_shown_with_debug() {
        let response = panic_response(Box::new(String::from("index out of bounds")), true);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["detail"], "index out of bounds");
    }
}
