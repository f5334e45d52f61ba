//! Evalgate - Evaluation Ingestion and Metrics Pipeline
//!
//! Main entry point for the Evalgate API server, which records AI-agent
//! interaction evaluations under per-tenant processing policies and serves
//! aggregated trend metrics.

use clap::{Parser, Subcommand};
use evalgate_core::{
    ApiServer, ApiServerConfig, AppState, IngestionPipeline, Settings, SqliteEvalStore,
    StaticTokenResolver, ThreadRngSource,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Get the default database path using the platform data directory
fn get_default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("evalgate")
        .join("evalgate.db")
}

/// Get the database path from CLI arg, settings, env var, or default
fn get_db_path(cli_path: Option<String>, settings: &Settings) -> String {
    cli_path
        .or_else(|| settings.database_path.clone())
        .or_else(|| std::env::var("EVALGATE_DB_PATH").ok())
        .unwrap_or_else(|| get_default_db_path().to_string_lossy().to_string())
}

#[derive(Parser)]
#[command(name = "evalgate")]
#[command(about = "Evaluation ingestion and metrics pipeline", version)]
struct Cli {
    /// Path to a TOML settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the SQLite database
    #[arg(long, global = true, env = "EVALGATE_DB_PATH")]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Bind address, e.g. 127.0.0.1:8080
        #[arg(short, long)]
        bind: Option<std::net::SocketAddr>,
    },

    /// Create the database and apply the schema, then exit
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let db_path = get_db_path(cli.db.clone(), &settings);

    if let Some(parent) = PathBuf::from(&db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    match cli.command {
        Commands::Serve { bind } => {
            let store = Arc::new(SqliteEvalStore::new(&db_path).await?);
            let pipeline = Arc::new(IngestionPipeline::new(
                store.clone(),
                Arc::new(ThreadRngSource),
            ));
            let resolver = Arc::new(StaticTokenResolver::new(settings.token_map()));

            let state = AppState {
                store,
                pipeline,
                resolver,
            };
            let config = ApiServerConfig {
                addr: bind.unwrap_or(settings.bind_addr),
            };

            info!("Starting evalgate with database at {}", db_path);
            ApiServer::new(config, state).serve().await?;
        }
        Commands::Init => {
            SqliteEvalStore::new(&db_path).await?;
            info!("Initialized database at {}", db_path);
        }
    }

    Ok(())
}
