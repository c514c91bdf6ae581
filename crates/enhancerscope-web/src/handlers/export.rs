//! Delimited download of the filtered rows.

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use enhancerscope_common::{ApiError, ExportFormat};
use enhancerscope_explorer::RawSelections;
use serde::Deserialize;
use tracing::{error, info};

use crate::handlers::{api_error, resolve_selections};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    #[serde(flatten)]
    pub selections: RawSelections,
}

/// GET /api/export?format=csv|tsv: attachment download
pub async fn api_export(
    State(state): State<SharedState>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let format = match query.format.as_deref() {
        Some(f) => f.parse::<ExportFormat>().map_err(ApiError::BadRequest)?,
        None => state.explorer.export_format(),
    };
    let selections = resolve_selections(&state, &query.selections)?;
    let view = state.explorer.view(&selections);

    let bytes = view.export_bytes(format).map_err(|e| {
        error!("Export of {} rows failed: {}", view.rows.len(), e);
        api_error(e)
    })?;
    let file_name = view.export_file_name(format);
    info!("Exporting {} rows as {}", view.rows.len(), file_name);

    Ok((
        [
            (header::CONTENT_TYPE, format.mime_type().to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
        ],
        bytes,
    ))
}
