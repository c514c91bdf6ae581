//! enhancerscope-web: dashboard server for the enhancer explorer
//! Provides:
//!   - The dashboard page (filters, accessibility tracks, imaging, catalog)
//!   - JSON endpoints for options, views, figures and imaging
//!   - Delimited export downloads
//!   - Comparison heatmap and per-cell-type profiles
//!   - Dataset summary, integrity report and health

pub mod handlers;
pub mod router;
pub mod state;
