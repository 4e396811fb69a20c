// Studio API server
// Decision: No DATABASE_URL means the in-memory dev backend
// Decision: Open SSE streams are closed by the hubs on shutdown so graceful shutdown can finish

use anyhow::{Context, Result};
use std::sync::Arc;
use studio_control_plane::{build_app, config::ServerConfig, Hubs};
use studio_core::telemetry::{init_telemetry, TelemetryConfig};
use studio_storage::StorageBackend;

#[tokio::main]
async fn main() -> Result<()> {
    // Seed the environment from .env when present
    let _ = dotenvy::dotenv();

    // Configure via environment variables:
    // - RUST_LOG / LOG_LEVEL: Log filter (default: "studio_control_plane=debug,tower_http=debug")
    // - LOG_FORMAT=json: Structured JSON output
    let mut telemetry_config = TelemetryConfig::from_env();
    if telemetry_config.service_name == "studio" {
        telemetry_config.service_name = "studio-control-plane".to_string();
    }
    init_telemetry(telemetry_config);

    tracing::info!("studio-control-plane starting...");

    let config = ServerConfig::from_env();
    tracing::info!(
        auth_mode = config.auth.mode.as_str(),
        heartbeat_secs = config.sse_heartbeat.as_secs(),
        connection_buffer = config.sse_connection_buffer,
        "Configuration loaded"
    );

    let db = match &config.database_url {
        Some(url) => {
            let db = StorageBackend::postgres(url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");
            db
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage (dev mode)");
            StorageBackend::in_memory()
        }
    };
    let db = Arc::new(db);

    let hubs = Hubs::new(db.clone(), config.hub_config());
    let app = build_app(db, &hubs, &config);

    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.http_addr))?;
    tracing::info!("HTTP server listening on {}", config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(hubs))
        .await
        .context("Server error")?;

    tracing::info!("studio-control-plane stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM, after closing every open stream.
async fn shutdown_signal(hubs: Hubs) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    let closed = hubs.shutdown();
    tracing::info!(closed_streams = closed, "Shutdown signal received, closing streams");
}
