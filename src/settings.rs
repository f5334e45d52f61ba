//! Service settings loaded from file and environment
//!
//! Settings cover the transport and storage surface (bind address, database
//! path, provisioned API tokens); per-tenant evaluation policy lives in the
//! database, not here. Environment variables use the `EVALGATE_` prefix and
//! override file values.

use crate::error::Result;
use crate::types::TenantId;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use uuid::Uuid;

/// Top-level service settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Address the API server binds to
    pub bind_addr: SocketAddr,

    /// SQLite database path; resolved to the platform data dir when unset
    #[serde(default)]
    pub database_path: Option<String>,

    /// Provisioned bearer tokens, keyed by token with tenant UUID values
    #[serde(default)]
    pub api_tokens: HashMap<String, Uuid>,
}

impl Settings {
    /// Load settings from an optional TOML file plus `EVALGATE_` env overrides
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder =
            config::Config::builder().set_default("bind_addr", "127.0.0.1:8080")?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(config::Environment::with_prefix("EVALGATE"));

        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Token table as typed tenant IDs
    pub fn token_map(&self) -> HashMap<String, TenantId> {
        self.api_tokens
            .iter()
            .map(|(token, tenant)| (token.clone(), TenantId(*tenant)))
            .collect()
    }
}
