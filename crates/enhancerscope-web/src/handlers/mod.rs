//! HTTP handlers for all web routes.

pub mod compare;
pub mod dashboard;
pub mod explore;
pub mod export;
pub mod system;

use enhancerscope_common::ApiError;
use enhancerscope_explorer::{ExplorerError, RawSelections, Selections};

use crate::state::AppState;

pub(crate) fn api_error(e: ExplorerError) -> ApiError {
    match e {
        ExplorerError::UnknownCellType(_) => ApiError::BadRequest(e.to_string()),
        ExplorerError::Export(inner) => ApiError::Export(inner.to_string()),
    }
}

/// Resolve request selections, turning unknown cell types into a 400.
pub(crate) fn resolve_selections(state: &AppState, raw: &RawSelections) -> Result<Selections, ApiError> {
    state.explorer.selections(raw).map_err(api_error)
}
