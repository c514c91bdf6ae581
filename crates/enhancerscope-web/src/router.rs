//! Axum router: maps all URL paths to handlers.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use enhancerscope_common::{ApiError, ServerConfig};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::handlers::{
    compare::{api_cell_type_profile, api_compare, api_overview},
    dashboard::dashboard,
    explore::{api_figure, api_imaging, api_options, api_view, api_view_post},
    export::api_export,
    system::{api_integrity, api_summary, health},
};
use crate::state::{AppState, SharedState};

pub const XSRF_HEADER: &str = "x-xsrf-token";

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server);
    let shared: SharedState = Arc::new(state);

    let mut router = Router::new()
        // Pages
        .route("/", get(dashboard))

        // API endpoints
        .route("/api/options",               get(api_options))
        .route("/api/view",                  get(api_view).post(api_view_post))
        .route("/api/figure",                get(api_figure))
        .route("/api/imaging",               get(api_imaging))
        .route("/api/export",                get(api_export))
        .route("/api/compare",               get(api_compare))
        .route("/api/cell-types/{ordinal}",  get(api_cell_type_profile))
        .route("/api/overview",              get(api_overview))
        .route("/api/summary",               get(api_summary))
        .route("/api/integrity",             get(api_integrity))
        .route("/health",                    get(health))

        // Middleware
        .layer(middleware::from_fn_with_state(shared.clone(), xsrf_guard));

    if let Some(cors) = cors {
        router = router.layer(cors);
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new()),
        )
        .with_state(shared)
}

/// `None` when CORS is disabled. An empty origin list allows any origin.
fn cors_layer(server: &ServerConfig) -> Option<CorsLayer> {
    if !server.enable_cors {
        return None;
    }
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    let origins: Vec<HeaderValue> = server
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    Some(if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    })
}

/// Rejects state-changing requests that do not carry the page's token.
async fn xsrf_guard(State(state): State<SharedState>, request: Request, next: Next) -> Result<Response, ApiError> {
    let safe = matches!(*request.method(), Method::GET | Method::HEAD | Method::OPTIONS);
    if safe || !state.config.server.enable_xsrf_protection {
        return Ok(next.run(request).await);
    }

    let token = request.headers().get(XSRF_HEADER).and_then(|v| v.to_str().ok());
    if token == Some(state.xsrf_token.as_str()) {
        Ok(next.run(request).await)
    } else {
        warn!("Rejected {} {} without a valid XSRF token", request.method(), request.uri().path());
        Err(ApiError::Forbidden("Missing or invalid XSRF token".into()))
    }
}
