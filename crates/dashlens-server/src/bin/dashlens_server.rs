//! dashlens API server binary.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin dashlens_server -p dashlens-server
//! ```
//!
//! # Environment Variables
//!
//! ## Server
//! - `DASHLENS_HOST`: Host to bind to (default: 127.0.0.1)
//! - `DASHLENS_PORT`: Port to bind to (default: 4310)
//! - `DASHLENS_ARTIFACT_ROOT`: Directory holding `manifest.json`,
//!   `catalog.json`, backups and the snapshot tree (default: `.`)
//! - `DASHLENS_CORS_ENABLED`: Enable CORS headers (default: true)
//! - `RUST_LOG`: Log level filter (default: `dashlens=info,dashlens_server=info`)
//!
//! ## Check thresholds
//! - `OBS_VOLUME_THRESHOLD_PCT`: Volume deviation threshold (default: 25)
//! - `OBS_FRESHNESS_THRESHOLD_MINUTES`: Freshness lag threshold (default: 180)
//! - `OBS_REFERENCE_FRESHNESS_THRESHOLD_MINUTES`: Threshold for
//!   reference-like nodes (default: 10080)

use std::net::SocketAddr;
use std::process::ExitCode;

use dashlens_server::{ApiConfig, ApiServer, ServerConfig};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Server configuration loaded from environment.
struct EnvConfig {
    host: String,
    port: u16,
    artifact_root: String,
    cors_enabled: bool,
}

impl EnvConfig {
    fn from_env() -> Self {
        Self {
            host: std::env::var("DASHLENS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("DASHLENS_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(4310),
            artifact_root: std::env::var("DASHLENS_ARTIFACT_ROOT")
                .unwrap_or_else(|_| ".".to_string()),
            cors_enabled: std::env::var("DASHLENS_CORS_ENABLED")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dashlens=info,dashlens_server=info,tower_http=info"));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    );

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {err}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = EnvConfig::from_env();
    init_tracing();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "dashlens API server starting"
    );

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(a) => a,
        Err(e) => {
            error!(host = %config.host, port = config.port, error = %e, "Invalid address");
            return ExitCode::FAILURE;
        }
    };

    let server_config = ServerConfig::default()
        .with_artifact_root(&config.artifact_root)
        .with_cors(config.cors_enabled);
    let api_config = ApiConfig {
        bind_addr: addr,
        server: server_config,
    };

    info!(
        addr = %addr,
        artifact_root = %config.artifact_root,
        cors_enabled = config.cors_enabled,
        health = format!("http://{addr}/health"),
        "Configuration loaded"
    );

    let server = ApiServer::new(api_config);

    if let Err(e) = server.run_until(shutdown_signal()).await {
        error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
