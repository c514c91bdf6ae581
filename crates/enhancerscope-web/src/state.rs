//! Shared application state for the web server.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use enhancerscope_common::AppConfig;
use enhancerscope_data::{Dataset, DatasetSummary, IntegrityReport};
use enhancerscope_explorer::Explorer;
use uuid::Uuid;

/// Shared state injected into every Axum handler. Read-only after startup.
pub struct AppState {
    pub explorer: Explorer,
    pub config: AppConfig,
    pub summary: DatasetSummary,
    pub integrity: IntegrityReport,
    /// Token every non-GET request must echo in `x-xsrf-token`.
    pub xsrf_token: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(dataset: Arc<Dataset>, config: AppConfig) -> Self {
        let summary = DatasetSummary::compute(&dataset);
        let integrity = IntegrityReport::check(&dataset);
        Self {
            explorer: Explorer::from_config(dataset, &config),
            config,
            summary,
            integrity,
            xsrf_token: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        self.explorer.dataset()
    }
}

pub type SharedState = Arc<AppState>;
