//! Health endpoint

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use clausewise_core::ai::AIBackend;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
    pub model: String,
    pub render_mode: String,
    pub streaming: bool,
}

/// GET /health - Service status and active configuration
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let ai = state.analyzer.ai();
    Json(HealthResponse {
        status: "ok",
        backend: ai.kind(),
        model: ai.model().to_string(),
        render_mode: state.analyzer.mode().to_string(),
        streaming: state.streaming(),
    })
}
