//! HTTP API server for ingestion, config, and metrics
//!
//! Thin transport layer over the core: handlers authenticate the tenant,
//! delegate to the pipeline/aggregator, and map the error taxonomy onto
//! status codes. Timeouts, retries, and backoff are the client's concern.

use super::state::AppState;
use crate::error::{EvalGateError, Result};
use crate::metrics::{self, MetricsSummary, Period};
use crate::types::{
    AuditLogEntry, ConfigApplied, ConfigPatch, EvaluationConfig, IngestOutcome, IngestPayload,
    TenantId,
};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 8080).into(),
        }
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Create a new API server over the shared state
    pub fn new(config: ApiServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Build the router with all routes and middleware
    pub fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/api/evals/ingest", post(ingest_handler))
            .route(
                "/api/config",
                get(get_config_handler).post(update_config_handler),
            )
            .route("/api/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve until the process is stopped
    pub async fn serve(self) -> anyhow::Result<()> {
        let router = Self::build_router(self.state);
        let listener = tokio::net::TcpListener::bind(self.config.addr).await?;
        info!("Evalgate API listening on {}", self.config.addr);
        axum::serve(listener, router).await?;
        Ok(())
    }
}

/// Error body returned for every failed request
#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Wrapper mapping core errors onto HTTP responses
struct ApiError(EvalGateError);

impl From<EvalGateError> for ApiError {
    fn from(err: EvalGateError) -> Self {
        ApiError(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError(EvalGateError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            EvalGateError::Validation { .. } => (StatusCode::BAD_REQUEST, self.0.to_string()),
            EvalGateError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.0.to_string()),
            EvalGateError::NotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            other => {
                // Internal detail stays in the log, not the response
                error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Resolve the bearer token in `Authorization` to a tenant
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<TenantId> {
    let header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| EvalGateError::Unauthorized("missing bearer token".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| EvalGateError::Unauthorized("missing bearer token".to_string()))?;

    state
        .resolver
        .resolve(token)
        .await
        .ok_or_else(|| EvalGateError::Unauthorized("invalid token".to_string()))
}

/// Successful ingestion response
#[derive(Debug, Serialize, Deserialize)]
struct IngestResponse {
    success: bool,
    eval_id: String,
    tenant_id: TenantId,
    config_applied: ConfigApplied,
}

/// Acknowledgment for submissions dropped by sampling policy
#[derive(Debug, Serialize, Deserialize)]
struct SampledOutResponse {
    success: bool,
    eval_id: String,
    message: String,
}

async fn ingest_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<IngestPayload>,
) -> std::result::Result<Response, ApiError> {
    let tenant_id = authenticate(&state, &headers).await?;

    match state.pipeline.ingest(tenant_id, payload).await? {
        IngestOutcome::Ingested {
            record,
            config_applied,
            audit_recorded,
        } => {
            if !audit_recorded {
                warn!(eval_id = %record.id, "Ingestion committed without audit entry");
            }
            Ok((
                StatusCode::CREATED,
                Json(IngestResponse {
                    success: true,
                    eval_id: record.id.to_string(),
                    tenant_id,
                    config_applied,
                }),
            )
                .into_response())
        }
        IngestOutcome::SampledOut => Ok((
            StatusCode::ACCEPTED,
            Json(SampledOutResponse {
                success: true,
                eval_id: "sampled_out".to_string(),
                message: "Not sampled".to_string(),
            }),
        )
            .into_response()),
    }
}

/// Fetch the tenant's config, lazily persisting defaults on first read
async fn get_config_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> std::result::Result<Json<EvaluationConfig>, ApiError> {
    let tenant_id = authenticate(&state, &headers).await?;

    if let Some(config) = state.store.get_config(tenant_id).await? {
        return Ok(Json(config));
    }

    let defaults = EvaluationConfig::default();
    state.store.put_config(tenant_id, &defaults).await?;
    info!(tenant_id = %tenant_id, "Created default config on first read");
    Ok(Json(defaults))
}

/// Upsert a partial-or-full config change and audit it
async fn update_config_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(patch): Json<ConfigPatch>,
) -> std::result::Result<Json<EvaluationConfig>, ApiError> {
    let tenant_id = authenticate(&state, &headers).await?;

    let current = state
        .store
        .get_config(tenant_id)
        .await?
        .unwrap_or_default();
    let updated = current.apply(&patch);
    state.store.put_config(tenant_id, &updated).await?;

    let audit = AuditLogEntry::new(
        tenant_id,
        "CONFIG_UPDATED",
        "evaluation_config",
        tenant_id.to_string(),
        serde_json::to_value(&patch)?,
    );
    if let Err(e) = state.store.append_audit(&audit).await {
        warn!(tenant_id = %tenant_id, "Audit write failed: {}", e);
    }

    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
struct MetricsParams {
    period: Option<String>,
}

async fn metrics_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<MetricsParams>,
) -> std::result::Result<Json<MetricsSummary>, ApiError> {
    let tenant_id = authenticate(&state, &headers).await?;

    let period = match params.period.as_deref() {
        None => Period::default(),
        Some(raw) => raw
            .parse::<Period>()
            .map_err(|e| EvalGateError::validation("period", e))?,
    };

    let records = state
        .store
        .evaluations_since(tenant_id, period.cutoff())
        .await?;
    Ok(Json(metrics::aggregate(&records)))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
