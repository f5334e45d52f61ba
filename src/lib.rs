//! Evalgate - Evaluation Ingestion and Metrics Pipeline
//!
//! A Rust service that records evaluations of AI-agent interactions and
//! provides:
//! - Per-tenant processing policy (uniform sampling, PII redaction)
//! - Pattern-based PII scrubbing with per-category placeholders
//! - Append-only evaluation and audit persistence (SQLite)
//! - Daily KPI and trend aggregation for dashboards
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Types**: Core data structures (EvaluationRecord, EvaluationConfig, etc.)
//! - **Policy / Redact**: Pure decision and scrubbing functions
//! - **Pipeline**: Orchestration of one ingestion (validate, decide, persist, audit)
//! - **Storage**: Pooled SQLite backend behind the `EvalStore` trait
//! - **Api**: Axum transport exposing ingest, config, and metrics routes
//!
//! # Example
//!
//! ```ignore
//! use evalgate_core::{IngestionPipeline, SqliteEvalStore, ThreadRngSource};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(SqliteEvalStore::new("evalgate.db").await?);
//!     let pipeline = IngestionPipeline::new(store.clone(), Arc::new(ThreadRngSource));
//!
//!     let outcome = pipeline.ingest(tenant_id, payload).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod policy;
pub mod redact;
pub mod settings;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use api::{ApiServer, ApiServerConfig, AppState, StaticTokenResolver, TenantResolver};
pub use error::{EvalGateError, Result};
pub use metrics::{aggregate, DailyMetric, MetricsSummary, Period};
pub use pipeline::IngestionPipeline;
pub use policy::{decide, FixedSource, PolicyDecision, SampleSource, ThreadRngSource};
pub use redact::{redact, Redaction};
pub use settings::Settings;
pub use storage::{sqlite::SqliteEvalStore, EvalStore};
pub use types::{
    AuditLogEntry, ConfigApplied, ConfigPatch, EvalId, EvaluationConfig, EvaluationRecord,
    IngestOutcome, IngestPayload, RunPolicy, TenantId,
};
