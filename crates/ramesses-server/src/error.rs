use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ramesses_core::StorageError;
use tracing::error;

/// Failures of a request handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self, "request failed");
        let status = match &self {
            ApiError::Storage(StorageError::QueueNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, format!("{} {}\n", status.as_u16(), self)).into_response()
    }
}

/// Plain-text 405 for any method a route does not serve.
pub async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, "405 method not allowed\n").into_response()
}
