//! # dropspot-server
//!
//! HTTP binding for the Dropspot claim & waitlist engine.
//!
//! This binary provides:
//! - **Public drop browsing** with live remaining stock and window status
//! - **Waitlist and claim endpoints** for users authenticated upstream
//! - **Admin API** (bearer token) for drop lifecycle management
//!
//! All consistency guarantees live in `dropspot-core`; handlers only parse
//! requests and hand the work to the engine on the blocking thread pool.

mod api;
mod auth;
mod config;
mod error;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use dropspot_core::DropEngine;
use dropspot_shared::{PriorityCoefficients, PriorityScorer, ProjectSeed};
use dropspot_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,dropspot_server=debug")),
        )
        .init();

    info!("Starting Dropspot server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    info!(
        instance = %config.instance_name,
        admin_enabled = config.admin_token.is_some(),
        "Instance settings"
    );

    // -----------------------------------------------------------------------
    // 3. Open the database (runs migrations)
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    if let Some(path) = db.path() {
        info!(path = %path.display(), "Database ready");
    }

    // -----------------------------------------------------------------------
    // 4. Derive priority coefficients once for the whole process
    // -----------------------------------------------------------------------
    let seed = ProjectSeed::derive(&config.priority_seed);
    let coefficients = PriorityCoefficients::from_seed(&seed);
    info!(
        seed = %seed,
        a = coefficients.a,
        b = coefficients.b,
        c = coefficients.c,
        "Priority coefficients"
    );

    let engine = DropEngine::new(db, PriorityScorer::new(coefficients));

    let http_addr = config.http_addr;
    let app_state = AppState {
        engine: Arc::new(engine),
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
