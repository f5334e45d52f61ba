//! Evaluation ingestion pipeline
//!
//! Orchestrates one submission end to end: validate the payload, load the
//! tenant's policy, decide sampling, optionally redact PII, persist the
//! record, and emit a best-effort audit entry. The store and the randomness
//! source are injected so both can be substituted in tests.

use crate::error::{EvalGateError, Result};
use crate::policy::{self, SampleSource};
use crate::redact;
use crate::storage::EvalStore;
use crate::types::{
    AuditLogEntry, ConfigApplied, EvalId, EvaluationRecord, IngestOutcome, IngestPayload, TenantId,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ingestion pipeline for one-tenant evaluation submissions
pub struct IngestionPipeline {
    store: Arc<dyn EvalStore>,
    sampler: Arc<dyn SampleSource>,
}

impl IngestionPipeline {
    /// Create a pipeline over the given store and randomness source
    pub fn new(store: Arc<dyn EvalStore>, sampler: Arc<dyn SampleSource>) -> Self {
        Self { store, sampler }
    }

    /// Ingest one evaluation for the authenticated tenant
    ///
    /// Sampled-out submissions return [`IngestOutcome::SampledOut`] without
    /// persisting anything; that is a success, not an error. Audit failure
    /// after a committed insert is logged and reported via
    /// `audit_recorded: false`, never rolled back.
    pub async fn ingest(
        &self,
        tenant_id: TenantId,
        payload: IngestPayload,
    ) -> Result<IngestOutcome> {
        let payload = validate(payload)?;

        // Absent config means defaults; persisting them is the config
        // service's job, not the pipeline's.
        let config = self
            .store
            .get_config(tenant_id)
            .await?
            .unwrap_or_default();

        let draw = self.sampler.draw_pct();
        let decision = policy::decide(&config, draw);
        if !decision.process {
            debug!(tenant_id = %tenant_id, draw, "Submission sampled out");
            return Ok(IngestOutcome::SampledOut);
        }

        let record = build_record(tenant_id, payload, decision.redact);

        self.store.insert_evaluation(&record).await?;
        info!(
            tenant_id = %tenant_id,
            eval_id = %record.id,
            pii_tokens_redacted = record.pii_tokens_redacted,
            "Evaluation ingested"
        );

        let audit = AuditLogEntry::new(
            tenant_id,
            "EVAL_INGESTED",
            "evaluation",
            record.id.to_string(),
            serde_json::json!({
                "score": record.score,
                "pii_redacted": record.pii_tokens_redacted,
            }),
        );
        let audit_recorded = match self.store.append_audit(&audit).await {
            Ok(()) => true,
            Err(e) => {
                // The record is already committed; audit is best-effort.
                warn!(eval_id = %record.id, "Audit write failed: {}", e);
                false
            }
        };

        Ok(IngestOutcome::Ingested {
            config_applied: ConfigApplied {
                run_policy: config.run_policy,
                pii_masked: decision.redact,
            },
            record,
            audit_recorded,
        })
    }
}

/// Check required fields and numeric ranges, failing on the first violation
fn validate(payload: IngestPayload) -> Result<IngestPayload> {
    if payload.interaction_id.trim().is_empty() {
        return Err(EvalGateError::validation(
            "interaction_id",
            "must not be empty",
        ));
    }
    if payload.prompt.trim().is_empty() {
        return Err(EvalGateError::validation("prompt", "must not be empty"));
    }
    if payload.response.trim().is_empty() {
        return Err(EvalGateError::validation("response", "must not be empty"));
    }
    match payload.score {
        None => return Err(EvalGateError::validation("score", "is required")),
        Some(s) if !(0.0..=100.0).contains(&s) || s.is_nan() => {
            return Err(EvalGateError::validation("score", "must be 0-100"));
        }
        Some(_) => {}
    }
    match payload.latency_ms {
        None => return Err(EvalGateError::validation("latency_ms", "is required")),
        Some(l) if l < 0.0 || l.is_nan() => {
            return Err(EvalGateError::validation(
                "latency_ms",
                "must be a non-negative number",
            ));
        }
        Some(_) => {}
    }
    if let Some(count) = payload.pii_tokens_redacted {
        if count < 0 {
            return Err(EvalGateError::validation(
                "pii_tokens_redacted",
                "must be non-negative",
            ));
        }
    }

    Ok(payload)
}

/// Construct the record to persist, running redaction when the policy asks
///
/// Masked variants are stored alongside the originals, never in their place.
/// When redaction is off, the caller-claimed redaction count (default 0)
/// is kept as-is.
fn build_record(tenant_id: TenantId, payload: IngestPayload, redact_pii: bool) -> EvaluationRecord {
    let (pii_tokens_redacted, prompt_masked, response_masked) = if redact_pii {
        let prompt = redact::redact(&payload.prompt);
        let response = redact::redact(&payload.response);
        (
            prompt.redacted_count + response.redacted_count,
            Some(prompt.masked),
            Some(response.masked),
        )
    } else {
        (payload.pii_tokens_redacted.unwrap_or(0), None, None)
    };

    EvaluationRecord {
        id: EvalId::new(),
        // Tenant comes from the authenticated caller, never the payload
        tenant_id,
        interaction_id: payload.interaction_id,
        prompt: payload.prompt,
        response: payload.response,
        score: payload.score,
        latency_ms: payload.latency_ms.unwrap_or(0.0),
        flags: payload.flags,
        pii_tokens_redacted,
        prompt_masked,
        response_masked,
        created_at: payload.created_at.unwrap_or_else(Utc::now),
    }
}
