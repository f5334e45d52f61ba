//! Storage layer for the Evalgate pipeline
//!
//! Provides the abstraction and SQLite implementation for persistent storage
//! of evaluation records, per-tenant configs, and audit logs.

pub mod sqlite;

use crate::error::Result;
use crate::types::{AuditLogEntry, EvaluationConfig, EvaluationRecord, TenantId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Storage backend trait defining all required operations
///
/// Evaluation writes are independent and append-only, so implementations
/// need no cross-request coordination; a single insert either commits
/// durably or fails entirely.
#[async_trait]
pub trait EvalStore: Send + Sync {
    /// Fetch a tenant's config, if one has been stored
    async fn get_config(&self, tenant_id: TenantId) -> Result<Option<EvaluationConfig>>;

    /// Insert or replace a tenant's config
    async fn put_config(&self, tenant_id: TenantId, config: &EvaluationConfig) -> Result<()>;

    /// Persist one evaluation record (never updated or deleted afterwards)
    async fn insert_evaluation(&self, record: &EvaluationRecord) -> Result<()>;

    /// List a tenant's records created at or after `cutoff`, newest first
    async fn evaluations_since(
        &self,
        tenant_id: TenantId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<EvaluationRecord>>;

    /// Append an audit log entry
    async fn append_audit(&self, entry: &AuditLogEntry) -> Result<()>;

    /// Total stored evaluations for a tenant
    async fn count_evaluations(&self, tenant_id: TenantId) -> Result<usize>;
}
