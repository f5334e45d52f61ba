//! SQLite storage backend implementation
//!
//! Persistent storage using bundled rusqlite behind a deadpool connection
//! pool. The schema is embedded and applied at startup, so a fresh database
//! file is usable immediately. Timestamps are stored as RFC 3339 text;
//! `flags` and audit `details` are stored as JSON text columns.

use crate::error::{EvalGateError, Result};
use crate::storage::EvalStore;
use crate::types::{
    AuditLogEntry, EvalId, EvaluationConfig, EvaluationRecord, RunPolicy, TenantId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_sqlite::{Config, Pool, Runtime};
use rusqlite::{params, Row};
use std::path::Path;
use tracing::{debug, info};

/// Default connection pool size
const DEFAULT_POOL_SIZE: usize = 8;

/// Embedded schema, applied with CREATE IF NOT EXISTS on every startup
const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS evaluation_configs (
    tenant_id TEXT PRIMARY KEY NOT NULL,
    run_policy TEXT NOT NULL CHECK(run_policy IN ('always', 'sampled')),
    sample_rate_pct INTEGER NOT NULL,
    obfuscate_pii INTEGER NOT NULL DEFAULT 0,
    max_eval_per_day INTEGER NOT NULL DEFAULT 1000,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS evaluations (
    id TEXT PRIMARY KEY NOT NULL,
    tenant_id TEXT NOT NULL,
    interaction_id TEXT NOT NULL,
    prompt TEXT NOT NULL,
    response TEXT NOT NULL,
    score REAL,
    latency_ms REAL NOT NULL,
    flags TEXT NOT NULL DEFAULT '[]',
    pii_tokens_redacted INTEGER NOT NULL DEFAULT 0,
    prompt_masked TEXT,
    response_masked TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_evaluations_tenant_created
    ON evaluations(tenant_id, created_at);

CREATE TABLE IF NOT EXISTS audit_logs (
    id TEXT PRIMARY KEY NOT NULL,
    tenant_id TEXT NOT NULL,
    action TEXT NOT NULL,
    resource_type TEXT NOT NULL,
    resource_id TEXT NOT NULL,
    details TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL
);
"#;

/// SQLite storage backend with connection pooling
pub struct SqliteEvalStore {
    pool: Pool,
}

fn db_err(e: rusqlite::Error) -> EvalGateError {
    EvalGateError::Database(e.to_string())
}

fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EvalGateError::Database(format!("Invalid {} timestamp '{}': {}", column, raw, e)))
}

fn row_to_config(row: &Row<'_>) -> rusqlite::Result<(String, i64, bool, i64, String)> {
    Ok((
        row.get("run_policy")?,
        row.get("sample_rate_pct")?,
        row.get::<_, i64>("obfuscate_pii")? != 0,
        row.get("max_eval_per_day")?,
        row.get("updated_at")?,
    ))
}

/// Raw evaluation row before timestamp/JSON decoding
type EvalRow = (
    String,         // id
    String,         // tenant_id
    String,         // interaction_id
    String,         // prompt
    String,         // response
    Option<f64>,    // score
    f64,            // latency_ms
    String,         // flags (JSON)
    i64,            // pii_tokens_redacted
    Option<String>, // prompt_masked
    Option<String>, // response_masked
    String,         // created_at
);

fn row_to_eval(row: &Row<'_>) -> rusqlite::Result<EvalRow> {
    Ok((
        row.get("id")?,
        row.get("tenant_id")?,
        row.get("interaction_id")?,
        row.get("prompt")?,
        row.get("response")?,
        row.get("score")?,
        row.get("latency_ms")?,
        row.get("flags")?,
        row.get("pii_tokens_redacted")?,
        row.get("prompt_masked")?,
        row.get("response_masked")?,
        row.get("created_at")?,
    ))
}

fn decode_eval(raw: EvalRow) -> Result<EvaluationRecord> {
    let (
        id,
        tenant_id,
        interaction_id,
        prompt,
        response,
        score,
        latency_ms,
        flags,
        pii_tokens_redacted,
        prompt_masked,
        response_masked,
        created_at,
    ) = raw;

    Ok(EvaluationRecord {
        id: EvalId::from_string(&id)?,
        tenant_id: TenantId::from_string(&tenant_id)?,
        interaction_id,
        prompt,
        response,
        score,
        latency_ms,
        flags: serde_json::from_str(&flags)?,
        pii_tokens_redacted,
        prompt_masked,
        response_masked,
        created_at: parse_timestamp(&created_at, "created_at")?,
    })
}

impl SqliteEvalStore {
    /// Open (creating if missing) a database at `db_path` and apply the schema
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        Self::with_pool_size(db_path, DEFAULT_POOL_SIZE).await
    }

    /// Open with a custom pool size
    pub async fn with_pool_size<P: AsRef<Path>>(db_path: P, pool_size: usize) -> Result<Self> {
        let path_str = db_path.as_ref().to_string_lossy().to_string();
        info!(
            "Opening evaluation store at: {} (pool_size: {})",
            path_str, pool_size
        );

        let mut config = Config::new(path_str);
        config.pool = Some(deadpool_sqlite::PoolConfig::new(pool_size));
        let pool = config.create_pool(Runtime::Tokio1).map_err(|e| {
            EvalGateError::Database(format!("Failed to create connection pool: {}", e))
        })?;

        let store = Self { pool };
        store.apply_schema().await?;
        Ok(store)
    }

    async fn apply_schema(&self) -> Result<()> {
        let conn = self.get_conn().await?;
        conn.interact(|conn| -> Result<()> {
            conn.execute_batch(SCHEMA).map_err(db_err)?;
            Ok(())
        })
        .await
        .map_err(|e| EvalGateError::Database(format!("Pool interaction failed: {}", e)))??;

        debug!("Schema applied");
        Ok(())
    }

    async fn get_conn(&self) -> Result<deadpool_sqlite::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| EvalGateError::Database(format!("Failed to get connection: {}", e)))
    }
}

#[async_trait]
impl EvalStore for SqliteEvalStore {
    async fn get_config(&self, tenant_id: TenantId) -> Result<Option<EvaluationConfig>> {
        let conn = self.get_conn().await?;
        let tenant = tenant_id.to_string();

        let raw = conn
            .interact(move |conn| -> Result<Option<(String, i64, bool, i64, String)>> {
                let mut stmt = conn
                    .prepare(
                        "SELECT run_policy, sample_rate_pct, obfuscate_pii, max_eval_per_day, updated_at
                         FROM evaluation_configs WHERE tenant_id = ?1",
                    )
                    .map_err(db_err)?;
                let mut rows = stmt
                    .query_map(params![tenant], row_to_config)
                    .map_err(db_err)?;
                match rows.next() {
                    Some(row) => Ok(Some(row.map_err(db_err)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(|e| EvalGateError::Database(format!("Pool interaction failed: {}", e)))??;

        match raw {
            None => Ok(None),
            Some((policy, sample_rate_pct, obfuscate_pii, max_eval_per_day, updated_at)) => {
                let run_policy = match policy.as_str() {
                    "always" => RunPolicy::Always,
                    "sampled" => RunPolicy::Sampled,
                    other => {
                        return Err(EvalGateError::Database(format!(
                            "Unknown run_policy '{}'",
                            other
                        )))
                    }
                };
                Ok(Some(EvaluationConfig {
                    run_policy,
                    sample_rate_pct,
                    obfuscate_pii,
                    max_eval_per_day,
                    updated_at: parse_timestamp(&updated_at, "updated_at")?,
                }))
            }
        }
    }

    async fn put_config(&self, tenant_id: TenantId, config: &EvaluationConfig) -> Result<()> {
        let conn = self.get_conn().await?;
        let tenant = tenant_id.to_string();
        let policy = config.run_policy.to_string();
        let (rate, pii, cap) = (
            config.sample_rate_pct,
            config.obfuscate_pii as i64,
            config.max_eval_per_day,
        );
        let updated_at = config.updated_at.to_rfc3339();

        conn.interact(move |conn| -> Result<()> {
            conn.execute(
                "INSERT OR REPLACE INTO evaluation_configs
                 (tenant_id, run_policy, sample_rate_pct, obfuscate_pii, max_eval_per_day, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![tenant, policy, rate, pii, cap, updated_at],
            )
            .map_err(db_err)?;
            Ok(())
        })
        .await
        .map_err(|e| EvalGateError::Database(format!("Pool interaction failed: {}", e)))??;

        debug!(tenant_id = %tenant_id, "Config upserted");
        Ok(())
    }

    async fn insert_evaluation(&self, record: &EvaluationRecord) -> Result<()> {
        let conn = self.get_conn().await?;
        let flags = serde_json::to_string(&record.flags)?;
        let record = record.clone();

        conn.interact(move |conn| -> Result<()> {
            conn.execute(
                "INSERT INTO evaluations
                 (id, tenant_id, interaction_id, prompt, response, score, latency_ms,
                  flags, pii_tokens_redacted, prompt_masked, response_masked, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    record.id.to_string(),
                    record.tenant_id.to_string(),
                    record.interaction_id,
                    record.prompt,
                    record.response,
                    record.score,
                    record.latency_ms,
                    flags,
                    record.pii_tokens_redacted,
                    record.prompt_masked,
                    record.response_masked,
                    record.created_at.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;
            Ok(())
        })
        .await
        .map_err(|e| EvalGateError::Database(format!("Pool interaction failed: {}", e)))??;

        Ok(())
    }

    async fn evaluations_since(
        &self,
        tenant_id: TenantId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<EvaluationRecord>> {
        let conn = self.get_conn().await?;
        let tenant = tenant_id.to_string();
        let cutoff = cutoff.to_rfc3339();

        let raw_rows = conn
            .interact(move |conn| -> Result<Vec<EvalRow>> {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, tenant_id, interaction_id, prompt, response, score,
                                latency_ms, flags, pii_tokens_redacted, prompt_masked,
                                response_masked, created_at
                         FROM evaluations
                         WHERE tenant_id = ?1 AND created_at >= ?2
                         ORDER BY created_at DESC",
                    )
                    .map_err(db_err)?;
                let rows = stmt
                    .query_map(params![tenant, cutoff], row_to_eval)
                    .map_err(db_err)?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
            })
            .await
            .map_err(|e| EvalGateError::Database(format!("Pool interaction failed: {}", e)))??;

        raw_rows.into_iter().map(decode_eval).collect()
    }

    async fn append_audit(&self, entry: &AuditLogEntry) -> Result<()> {
        let conn = self.get_conn().await?;
        let details = serde_json::to_string(&entry.details)?;
        let entry = entry.clone();

        conn.interact(move |conn| -> Result<()> {
            conn.execute(
                "INSERT INTO audit_logs
                 (id, tenant_id, action, resource_type, resource_id, details, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    entry.id.to_string(),
                    entry.tenant_id.to_string(),
                    entry.action,
                    entry.resource_type,
                    entry.resource_id,
                    details,
                    entry.created_at.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;
            Ok(())
        })
        .await
        .map_err(|e| EvalGateError::Audit(format!("Pool interaction failed: {}", e)))??;

        Ok(())
    }

    async fn count_evaluations(&self, tenant_id: TenantId) -> Result<usize> {
        let conn = self.get_conn().await?;
        let tenant = tenant_id.to_string();

        let count = conn
            .interact(move |conn| -> Result<usize> {
                let count: i64 = conn
                    .query_row(
                        "SELECT COUNT(*) FROM evaluations WHERE tenant_id = ?1",
                        params![tenant],
                        |row| row.get(0),
                    )
                    .map_err(db_err)?;
                Ok(count as usize)
            })
            .await
            .map_err(|e| EvalGateError::Database(format!("Pool interaction failed: {}", e)))??;

        Ok(count)
    }
}
