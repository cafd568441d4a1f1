use std::fmt::Write;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ramesses_core::QueueStats;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

/// `POST /jobs`: store the request body as a new message.
pub async fn enqueue(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, String), ApiError> {
    let queue = state.queue.clone();
    let id = tokio::task::spawn_blocking(move || queue.enqueue(body.to_vec())).await??;
    info!(msg_id = id, "stored item");
    Ok((StatusCode::CREATED, format!("Stored item id={id}\n")))
}

/// `GET /jobs/all`: one line per stored message, then `done`.
pub async fn list_all(State(state): State<AppState>) -> Result<String, ApiError> {
    let queue = state.queue.clone();
    let messages = tokio::task::spawn_blocking(move || queue.list_all()).await??;

    let mut out = String::new();
    for (id, body) in messages {
        let _ = writeln!(out, "key={id} value={}", String::from_utf8_lossy(&body));
    }
    out.push_str("done\n");
    Ok(out)
}

/// `GET /jobs/stats`
pub async fn stats(State(state): State<AppState>) -> Result<Json<QueueStats>, ApiError> {
    let queue = state.queue.clone();
    let visibility = state.visibility_timeout;
    let stats = tokio::task::spawn_blocking(move || queue.stats(visibility)).await??;
    Ok(Json(stats))
}
