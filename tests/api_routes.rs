//! Router-level tests for the HTTP API
//!
//! Drives the axum router directly with `tower::ServiceExt::oneshot`
//! against a tempfile-backed store: auth rejection, ingest status codes,
//! lazy config creation, and the metrics route.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use evalgate_core::{
    ApiServer, AppState, FixedSource, IngestionPipeline, SqliteEvalStore, StaticTokenResolver,
    TenantId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const TOKEN: &str = "tok-integration";

async fn test_router(dir: &TempDir, draw: f64) -> (axum::Router, TenantId) {
    let store = Arc::new(
        SqliteEvalStore::new(dir.path().join("evalgate.db"))
            .await
            .unwrap(),
    );
    let pipeline = Arc::new(IngestionPipeline::new(
        store.clone(),
        Arc::new(FixedSource(draw)),
    ));

    let tenant = TenantId::new();
    let mut tokens = HashMap::new();
    tokens.insert(TOKEN.to_string(), tenant);

    let state = AppState {
        store,
        pipeline,
        resolver: Arc::new(StaticTokenResolver::new(tokens)),
    };
    (ApiServer::build_router(state), tenant)
}

fn post_json(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn ingest_body(interaction: &str, score: f64) -> serde_json::Value {
    serde_json::json!({
        "interaction_id": interaction,
        "prompt": "what is the capital of France?",
        "response": "Paris",
        "score": score,
        "latency_ms": 120.0,
    })
}

#[tokio::test]
async fn health_needs_no_auth() {
    let dir = TempDir::new().unwrap();
    let (router, _) = test_router(&dir, 10.0).await;

    let response = router.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_or_unknown_token_is_unauthorized() {
    let dir = TempDir::new().unwrap();
    let (router, _) = test_router(&dir, 10.0).await;

    let response = router
        .clone()
        .oneshot(get("/api/metrics", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .oneshot(get("/api/metrics", Some("tok-bogus")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ingest_returns_created_with_config_echo() {
    let dir = TempDir::new().unwrap();
    let (router, tenant) = test_router(&dir, 10.0).await;

    let response = router
        .oneshot(post_json(
            "/api/evals/ingest",
            Some(TOKEN),
            ingest_body("int-1", 91.0),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["success"], serde_json::json!(true));
    assert_eq!(body["tenant_id"], serde_json::json!(tenant.to_string()));
    assert_eq!(body["config_applied"]["run_policy"], "always");
    assert_eq!(body["config_applied"]["pii_masked"], serde_json::json!(false));
    assert!(body["eval_id"].as_str().unwrap().len() > 10);
}

#[tokio::test]
async fn ingest_validation_names_the_field() {
    let dir = TempDir::new().unwrap();
    let (router, _) = test_router(&dir, 10.0).await;

    let mut body = ingest_body("int-1", 91.0);
    body["prompt"] = serde_json::json!("");
    let response = router
        .oneshot(post_json("/api/evals/ingest", Some(TOKEN), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("prompt"));
}

#[tokio::test]
async fn sampled_out_is_accepted_not_error() {
    let dir = TempDir::new().unwrap();
    // Fixed draw of 90 against the 40 pct rate below
    let (router, _) = test_router(&dir, 90.0).await;

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/config",
            Some(TOKEN),
            serde_json::json!({"run_policy": "sampled", "sample_rate_pct": 40}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(post_json(
            "/api/evals/ingest",
            Some(TOKEN),
            ingest_body("int-1", 91.0),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let body = body_json(response).await;
    assert_eq!(body["eval_id"], "sampled_out");
    assert_eq!(body["message"], "Not sampled");
}

#[tokio::test]
async fn config_get_creates_defaults_on_first_read() {
    let dir = TempDir::new().unwrap();
    let (router, _) = test_router(&dir, 10.0).await;

    let response = router
        .clone()
        .oneshot(get("/api/config", Some(TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["run_policy"], "always");
    assert_eq!(body["sample_rate_pct"], 100);
    assert_eq!(body["obfuscate_pii"], serde_json::json!(false));
    assert_eq!(body["max_eval_per_day"], 1000);

    // Second read returns the now-persisted row
    let response = router.oneshot(get("/api/config", Some(TOKEN))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn config_post_applies_partial_patch() {
    let dir = TempDir::new().unwrap();
    let (router, _) = test_router(&dir, 10.0).await;

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/config",
            Some(TOKEN),
            serde_json::json!({"obfuscate_pii": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["obfuscate_pii"], serde_json::json!(true));
    // Unpatched fields keep their defaults
    assert_eq!(body["run_policy"], "always");
    assert_eq!(body["sample_rate_pct"], 100);
}

#[tokio::test]
async fn metrics_route_aggregates_ingested_records() {
    let dir = TempDir::new().unwrap();
    let (router, _) = test_router(&dir, 10.0).await;

    for (interaction, score) in [("int-1", 80.0), ("int-2", 60.0), ("int-3", 100.0)] {
        let response = router
            .clone()
            .oneshot(post_json(
                "/api/evals/ingest",
                Some(TOKEN),
                ingest_body(interaction, score),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = router
        .clone()
        .oneshot(get("/api/metrics?period=7d", Some(TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["total_evals"], 3);
    assert_eq!(body["avg_score"], 80.0);
    assert_eq!(body["success_rate_pct"], 66.7);
    assert_eq!(body["trend_daily"].as_array().unwrap().len(), 1);

    // Unknown period is a validation failure
    let response = router
        .oneshot(get("/api/metrics?period=90d", Some(TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn metrics_empty_window_is_all_zero() {
    let dir = TempDir::new().unwrap();
    let (router, _) = test_router(&dir, 10.0).await;

    let response = router
        .oneshot(get("/api/metrics", Some(TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["total_evals"], 0);
    assert_eq!(body["avg_score"], 0.0);
    assert_eq!(body["pii_redactions_total"], 0);
    assert!(body["trend_daily"].as_array().unwrap().is_empty());
}
