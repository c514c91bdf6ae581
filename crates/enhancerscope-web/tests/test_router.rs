//! Router-level tests over the in-memory reference fixture.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use enhancerscope_common::AppConfig;
use enhancerscope_test_utils::reference_fixture;
use enhancerscope_web::router::{build_router, XSRF_HEADER};
use enhancerscope_web::state::AppState;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tower::ServiceExt;

fn state_with(config: AppConfig) -> AppState {
    AppState::new(Arc::new(reference_fixture().build()), config)
}

fn app() -> (Router, String) {
    let state = state_with(AppConfig::default());
    let token = state.xsrf_token.clone();
    (build_router(state), token)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = send(app, Request::get(uri).body(Body::empty()).unwrap()).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_dashboard_embeds_token() {
    let (app, token) = app();
    let (status, _, body) = send(app, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains(&token));
    assert!(html.contains("plotly"));
}

#[tokio::test]
async fn test_options_follow_cargo() {
    let (app, _) = app();
    let (status, json) = get_json(app, "/api/options?cargo=GFP&enhancer=All").await;
    assert_eq!(status, StatusCode::OK);
    let ordinals: Vec<u64> = json["cell_types"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["ordinal"].as_u64().unwrap())
        .collect();
    assert_eq!(ordinals, vec![1, 3, 4, 5]);
    assert_eq!(json["enhancers"], serde_json::json!(["E1", "E3"]));
}

#[tokio::test]
async fn test_view_for_enhancer() {
    let (app, _) = app();
    let (status, json) = get_json(app, "/api/view?enhancer=E1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["empty"], false);
    assert_eq!(json["row_count"], 15);
    assert_eq!(json["preview"].as_array().unwrap().len(), 15);
    assert_eq!(json["preview"][0]["enhancer_id"], "E1");
    assert_eq!(json["imaging"]["modality"], "lightsheet");
    assert_eq!(json["figure"]["data"].as_array().unwrap().len() >= 3, true);
}

#[tokio::test]
async fn test_zero_row_view_is_empty_not_error() {
    let (app, _) = app();
    let (status, json) = get_json(app, "/api/view?enhancer=E2&cargo=GFP").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["empty"], true);
    assert_eq!(json["row_count"], 0);
    assert!(json["summary"].is_null());
}

#[tokio::test]
async fn test_unknown_cell_type_is_bad_request() {
    let (app, _) = app();
    let (status, json) = get_json(app, "/api/view?cell_type=Astrocytes").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Astrocytes"));
}

#[tokio::test]
async fn test_imaging_requires_enhancer() {
    let (app, _) = app();
    let (status, _) = get_json(app.clone(), "/api/imaging").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = get_json(app, "/api/imaging?enhancer=E3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "unavailable");
}

#[tokio::test]
async fn test_export_download() {
    let (app, _) = app();
    let request = Request::get("/api/export?enhancer=E3&format=tsv").body(Body::empty()).unwrap();
    let (status, headers, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"E3_accessibility_data.tsv\""
    );
    let text = String::from_utf8(body).unwrap();
    assert_eq!(text.lines().count(), 4);
    assert!(text.starts_with("enhancer_id\tchr\t"));
}

#[tokio::test]
async fn test_export_file_name_is_header_safe() {
    let (app, _) = app();
    let request = Request::get("/api/export?enhancer=a%22b").body(Body::empty()).unwrap();
    let (status, headers, _) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"a_b_accessibility_data.csv\""
    );
}

#[tokio::test]
async fn test_export_rejects_unknown_format() {
    let (app, _) = app();
    let (status, _) = get_json(app, "/api/export?format=xlsx").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_post_view_requires_xsrf_token() {
    let (app, token) = app();
    let body = r#"{"enhancer":"E2"}"#;

    let request = Request::post("/api/view")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    let (status, _, _) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let request = Request::post("/api/view")
        .header(header::CONTENT_TYPE, "application/json")
        .header(XSRF_HEADER, token)
        .body(Body::from(body))
        .unwrap();
    let (status, _, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["row_count"], 8);
}

#[tokio::test]
async fn test_xsrf_can_be_disabled() {
    let mut config = AppConfig::default();
    config.server.enable_xsrf_protection = false;
    let app = build_router(state_with(config));
    let request = Request::post("/api/view")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _, _) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let mut config = AppConfig::default();
    config.server.enable_cors = true;
    config.server.cors_allowed_origins = vec!["http://lab.example.org".into()];
    let app = build_router(state_with(config));
    let request = Request::get("/health")
        .header(header::ORIGIN, "http://lab.example.org")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://lab.example.org");
}

#[tokio::test]
async fn test_compare_and_cell_type_profile() {
    let (app, _) = app();
    let (status, json) = get_json(app.clone(), "/api/compare?enhancers=E1,E2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["heatmap"]["enhancers"], serde_json::json!(["E1", "E2"]));

    let (status, _) = get_json(app.clone(), "/api/compare").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = get_json(app.clone(), "/api/cell-types/3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["profile"]["rows"].as_array().unwrap().len(), 2);

    let (status, _) = get_json(app.clone(), "/api/cell-types/30").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get_json(app, "/api/cell-types/99").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_overview_follows_selections() {
    let (app, _) = app();
    let (status, json) = get_json(app.clone(), "/api/overview").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["overview"]["top_enhancers"][0]["enhancer_id"], "E1");
    assert_eq!(json["overview"]["length_vs_mean"].as_array().unwrap().len(), 3);
    assert_eq!(json["figure"]["layout"]["annotations"].as_array().unwrap().len(), 4);

    let (status, json) = get_json(app.clone(), "/api/overview?cargo=SYFP2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["overview"]["length_vs_mean"].as_array().unwrap().len(), 1);

    let (status, _) = get_json(app, "/api/overview?enhancer=E2&cargo=GFP").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_summary_integrity_and_health() {
    let (app, _) = app();
    let (status, json) = get_json(app.clone(), "/api/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_enhancers"], 3);

    let (status, json) = get_json(app.clone(), "/api/integrity").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["clean"].is_boolean());

    let (status, json) = get_json(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["records"], 26);
}
