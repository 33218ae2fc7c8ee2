use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::domain::reader::{ReaderService, ReaderServiceApi};

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn health_ready(State(reader): State<Arc<ReaderService>>) -> impl IntoResponse {
    let session_loaded = reader.section_count().await.is_ok();

    (
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "reflow": reader.reflow_provider(),
            "speech": reader.speech_provider(),
            "session_loaded": session_loaded
        })),
    )
}
