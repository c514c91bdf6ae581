//! Selection-driven JSON endpoints behind the dashboard.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use enhancerscope_common::ApiError;
use enhancerscope_explorer::RawSelections;

use crate::handlers::resolve_selections;
use crate::state::SharedState;

/// GET /api/options: valid values per filter dimension
pub async fn api_options(
    State(state): State<SharedState>,
    Query(raw): Query<RawSelections>,
) -> Result<impl IntoResponse, ApiError> {
    let selections = resolve_selections(&state, &raw)?;
    Ok(Json(state.explorer.options(&selections)))
}

/// GET /api/view: options, figure, statistics, imaging and catalog
pub async fn api_view(
    State(state): State<SharedState>,
    Query(raw): Query<RawSelections>,
) -> Result<impl IntoResponse, ApiError> {
    let selections = resolve_selections(&state, &raw)?;
    Ok(Json(state.explorer.view(&selections).to_json()))
}

/// POST /api/view: same as GET with a JSON body
pub async fn api_view_post(
    State(state): State<SharedState>,
    Json(raw): Json<RawSelections>,
) -> Result<impl IntoResponse, ApiError> {
    let selections = resolve_selections(&state, &raw)?;
    Ok(Json(state.explorer.view(&selections).to_json()))
}

/// GET /api/figure: the track figure in Plotly form
pub async fn api_figure(
    State(state): State<SharedState>,
    Query(raw): Query<RawSelections>,
) -> Result<impl IntoResponse, ApiError> {
    let selections = resolve_selections(&state, &raw)?;
    let view = state.explorer.view(&selections);
    Ok(Json(view.figure.to_plotly()))
}

/// GET /api/imaging: imaging links for the selected enhancer
pub async fn api_imaging(
    State(state): State<SharedState>,
    Query(raw): Query<RawSelections>,
) -> Result<impl IntoResponse, ApiError> {
    let selections = resolve_selections(&state, &raw)?;
    let links = state
        .explorer
        .imaging(&selections)
        .ok_or_else(|| ApiError::BadRequest("Select an enhancer to view imaging".into()))?;
    Ok(Json(links))
}
