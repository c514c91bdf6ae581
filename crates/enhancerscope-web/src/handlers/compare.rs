//! Comparison heatmap, per-cell-type profile and the summary overview.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use enhancerscope_common::entities::{CellTypeOrdinal, MAX_CELL_TYPE_ORDINAL};
use enhancerscope_common::ApiError;
use enhancerscope_explorer::{
    build_cell_type_profile, build_comparison_heatmap, build_summary_dashboard, FilterEngine, RawSelections,
};
use serde::Deserialize;
use serde_json::json;

use crate::handlers::resolve_selections;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    /// Comma-separated enhancer identifiers.
    pub enhancers: Option<String>,
}

/// GET /api/compare?enhancers=E1,E2
pub async fn api_compare(
    State(state): State<SharedState>,
    Query(query): Query<CompareQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let ids: Vec<&str> = query
        .enhancers
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();
    if ids.is_empty() {
        return Err(ApiError::BadRequest("Provide enhancers=E1,E2,...".into()));
    }

    let heatmap = build_comparison_heatmap(state.dataset(), &ids);
    if heatmap.is_empty() {
        return Err(ApiError::NotFound(format!("No data found for enhancers {}", ids.join(", "))));
    }
    Ok(Json(json!({
        "heatmap": heatmap,
        "figure": heatmap.to_plotly(),
    })))
}

/// GET /api/cell-types/{ordinal}: one cell type across all enhancers
pub async fn api_cell_type_profile(
    State(state): State<SharedState>,
    Path(ordinal): Path<u8>,
) -> Result<impl IntoResponse, ApiError> {
    let ordinal = CellTypeOrdinal::new(ordinal).ok_or_else(|| {
        ApiError::BadRequest(format!("Cell type must be between 1 and {MAX_CELL_TYPE_ORDINAL}"))
    })?;
    let profile = build_cell_type_profile(state.dataset(), ordinal);
    if profile.is_empty() {
        return Err(ApiError::NotFound(format!("No data available for cell type {}", ordinal)));
    }
    Ok(Json(json!({
        "profile": profile,
        "figure": profile.to_plotly(),
    })))
}

/// GET /api/overview: four-panel summary over the filtered rows
pub async fn api_overview(
    State(state): State<SharedState>,
    Query(raw): Query<RawSelections>,
) -> Result<impl IntoResponse, ApiError> {
    let selections = resolve_selections(&state, &raw)?;
    let rows = FilterEngine::new(state.dataset()).apply_filters(&selections);
    let overview = build_summary_dashboard(&rows);
    if overview.is_empty() {
        return Err(ApiError::NotFound("No accessibility data for the current selection".into()));
    }
    Ok(Json(json!({
        "overview": overview,
        "figure": overview.to_plotly(),
    })))
}
