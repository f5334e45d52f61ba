//! Core data types for the Evalgate pipeline
//!
//! This module defines the fundamental data structures used throughout
//! evalgate: tenant-scoped evaluation configs, ingestion payloads, persisted
//! evaluation records, and audit log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for tenants
///
/// Wraps a UUID to provide type safety and prevent mixing tenant IDs
/// with other UUID-based identifiers in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub Uuid);

impl TenantId {
    /// Create a new random tenant ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a tenant ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for persisted evaluation records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvalId(pub Uuid);

impl EvalId {
    /// Create a new random evaluation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an evaluation ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for EvalId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EvalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Processing policy for incoming evaluations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPolicy {
    /// Every submission is processed
    Always,

    /// Submissions are processed with uniform per-event probability
    Sampled,
}

impl std::fmt::Display for RunPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPolicy::Always => write!(f, "always"),
            RunPolicy::Sampled => write!(f, "sampled"),
        }
    }
}

/// Per-tenant evaluation processing configuration
///
/// Exactly one config exists per tenant; absence implies [`Self::default`]
/// and triggers lazy creation on first read by the config service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Whether every submission is processed or only a sampled fraction
    pub run_policy: RunPolicy,

    /// Sampling percentage (0-100), meaningful only when `run_policy = sampled`
    pub sample_rate_pct: i64,

    /// Whether PII redaction runs on ingested text
    pub obfuscate_pii: bool,

    /// Declared daily evaluation limit (stored, not enforced by the pipeline)
    pub max_eval_per_day: i64,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            run_policy: RunPolicy::Always,
            sample_rate_pct: 100,
            obfuscate_pii: false,
            max_eval_per_day: 1000,
            updated_at: Utc::now(),
        }
    }
}

impl EvaluationConfig {
    /// Sampling rate clamped to the valid 0-100 range
    ///
    /// Out-of-range stored values are normalized here rather than failing
    /// the request.
    pub fn clamped_sample_rate(&self) -> i64 {
        self.sample_rate_pct.clamp(0, 100)
    }

    /// Apply a partial update, bumping `updated_at`
    pub fn apply(&self, patch: &ConfigPatch) -> Self {
        Self {
            run_policy: patch.run_policy.unwrap_or(self.run_policy),
            sample_rate_pct: patch.sample_rate_pct.unwrap_or(self.sample_rate_pct),
            obfuscate_pii: patch.obfuscate_pii.unwrap_or(self.obfuscate_pii),
            max_eval_per_day: patch.max_eval_per_day.unwrap_or(self.max_eval_per_day),
            updated_at: Utc::now(),
        }
    }
}

/// Partial-or-full config update, upserted keyed by tenant
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ConfigPatch {
    pub run_policy: Option<RunPolicy>,
    pub sample_rate_pct: Option<i64>,
    pub obfuscate_pii: Option<bool>,
    pub max_eval_per_day: Option<i64>,
}

/// Client-submitted evaluation of one AI-agent interaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestPayload {
    /// Caller-supplied opaque interaction identifier
    pub interaction_id: String,

    /// Prompt text sent to the agent
    pub prompt: String,

    /// Agent response text
    pub response: String,

    /// Quality score in [0, 100]
    pub score: Option<f64>,

    /// Observed latency in milliseconds, >= 0
    pub latency_ms: Option<f64>,

    /// Free-text labels attached by the caller
    #[serde(default)]
    pub flags: Vec<String>,

    /// Redaction count claimed by the caller (used only when redaction is off)
    pub pii_tokens_redacted: Option<i64>,

    /// Event timestamp; defaults to ingestion time, trusted as-is if supplied
    pub created_at: Option<DateTime<Utc>>,
}

/// Persisted evaluation record, immutable once written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Store-assigned identifier
    pub id: EvalId,

    /// Owning tenant, set by the pipeline from the authenticated caller
    pub tenant_id: TenantId,

    /// Caller-supplied interaction identifier (not deduplicated)
    pub interaction_id: String,

    /// Original prompt text, never overwritten by redaction
    pub prompt: String,

    /// Original response text, never overwritten by redaction
    pub response: String,

    /// Quality score in [0, 100]; ingestion requires it, but older stored
    /// rows may lack one, so aggregation must tolerate `None`
    pub score: Option<f64>,

    /// Observed latency in milliseconds
    pub latency_ms: f64,

    /// Free-text labels, insertion order irrelevant
    pub flags: Vec<String>,

    /// Number of redactions applied across prompt and response
    pub pii_tokens_redacted: i64,

    /// Redacted prompt, present only when redaction ran for this record
    pub prompt_masked: Option<String>,

    /// Redacted response, present only when redaction ran for this record
    pub response_masked: Option<String>,

    /// Event timestamp
    pub created_at: DateTime<Utc>,
}

/// Append-only audit record emitted on config changes and ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    /// Build a new audit entry stamped with the current time
    pub fn new(
        tenant_id: TenantId,
        action: &str,
        resource_type: &str,
        resource_id: String,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            action: action.to_string(),
            resource_type: resource_type.to_string(),
            resource_id,
            details,
            created_at: Utc::now(),
        }
    }
}

/// Config fields echoed back to the caller on successful ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigApplied {
    pub run_policy: RunPolicy,
    pub pii_masked: bool,
}

/// Outcome of one ingestion attempt
///
/// Sampled-out is a successful outcome with no persisted record, not an
/// error.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// Record persisted; audit emission is best-effort and tracked separately
    Ingested {
        record: EvaluationRecord,
        config_applied: ConfigApplied,
        audit_recorded: bool,
    },

    /// Dropped by sampling policy before persistence
    SampledOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_id_creation() {
        let id1 = TenantId::new();
        let id2 = TenantId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_config_defaults() {
        let config = EvaluationConfig::default();
        assert_eq!(config.run_policy, RunPolicy::Always);
        assert_eq!(config.sample_rate_pct, 100);
        assert!(!config.obfuscate_pii);
        assert_eq!(config.max_eval_per_day, 1000);
    }

    #[test]
    fn test_sample_rate_clamping() {
        let mut config = EvaluationConfig::default();
        config.sample_rate_pct = 250;
        assert_eq!(config.clamped_sample_rate(), 100);
        config.sample_rate_pct = -10;
        assert_eq!(config.clamped_sample_rate(), 0);
        config.sample_rate_pct = 42;
        assert_eq!(config.clamped_sample_rate(), 42);
    }

    #[test]
    fn test_config_patch_partial_apply() {
        let config = EvaluationConfig::default();
        let patch = ConfigPatch {
            run_policy: Some(RunPolicy::Sampled),
            sample_rate_pct: Some(25),
            ..Default::default()
        };

        let updated = config.apply(&patch);
        assert_eq!(updated.run_policy, RunPolicy::Sampled);
        assert_eq!(updated.sample_rate_pct, 25);
        // Untouched fields carry over
        assert!(!updated.obfuscate_pii);
        assert_eq!(updated.max_eval_per_day, 1000);
    }

    #[test]
    fn test_run_policy_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&RunPolicy::Sampled).unwrap(),
            "\"sampled\""
        );
        let parsed: RunPolicy = serde_json::from_str("\"always\"").unwrap();
        assert_eq!(parsed, RunPolicy::Always);
    }
}
