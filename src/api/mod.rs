//! HTTP API for evaluation ingestion, config, and metrics
//!
//! Provides:
//! - Ingestion endpoint applying the tenant's processing policy
//! - Config read/upsert with lazy default creation
//! - Aggregated KPI and trend metrics per lookback window

pub mod server;
pub mod state;

pub use server::{ApiServer, ApiServerConfig};
pub use state::{AppState, StaticTokenResolver, TenantResolver};
