//! Dataset summary, integrity report and health.

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::state::SharedState;

/// GET /health
pub async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    let dataset = state.dataset();
    Json(json!({
        "status": "ok",
        "enhancers": dataset.enhancer_count(),
        "records": dataset.records().len(),
        "loaded_at": dataset.loaded_at(),
        "started_at": state.started_at,
    }))
}

/// GET /api/summary
pub async fn api_summary(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.summary.clone())
}

/// GET /api/integrity
pub async fn api_integrity(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "clean": state.integrity.is_clean(),
        "report": state.integrity,
    }))
}
