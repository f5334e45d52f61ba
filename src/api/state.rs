//! Shared state and the tenant authentication boundary
//!
//! Authentication proper (sessions, signup, token issuance) lives outside
//! this service; the API only needs a way to turn a bearer token into a
//! tenant identity, expressed here as the [`TenantResolver`] trait.

use crate::pipeline::IngestionPipeline;
use crate::storage::EvalStore;
use crate::types::TenantId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves a bearer token to the tenant that owns it
#[async_trait]
pub trait TenantResolver: Send + Sync {
    /// Returns the tenant for `token`, or `None` if the token is unknown
    async fn resolve(&self, token: &str) -> Option<TenantId>;
}

/// Token table loaded from configuration
///
/// Suitable for deployments where tokens are provisioned out of band; a
/// real identity provider would implement [`TenantResolver`] instead.
pub struct StaticTokenResolver {
    tokens: HashMap<String, TenantId>,
}

impl StaticTokenResolver {
    pub fn new(tokens: HashMap<String, TenantId>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl TenantResolver for StaticTokenResolver {
    async fn resolve(&self, token: &str) -> Option<TenantId> {
        self.tokens.get(token).copied()
    }
}

/// API server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Evaluation store
    pub store: Arc<dyn EvalStore>,
    /// Ingestion pipeline
    pub pipeline: Arc<IngestionPipeline>,
    /// Bearer-token to tenant resolver
    pub resolver: Arc<dyn TenantResolver>,
}
