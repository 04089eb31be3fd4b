//! Warden Server - Main entry point

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use warden_core::{
    api::{self, AppState, ThreatModel},
    config::Config,
    rbac::{AuthorizeLayer, ResourceOwner},
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = match std::env::var("WARDEN_CONFIG") {
        Ok(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => Config::load().context("loading configuration from environment")?,
    };

    let handle = telemetry::init_telemetry(&config.logging, &config.metrics)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Warden Server");

    // Policy problems must stop startup, never degrade into allow-all.
    let authorizer = Arc::new(config.build_authorizer()?);
    let resolver = Arc::new(config.build_resolver()?);
    tracing::info!(
        permissions = authorizer.evaluator().table().len(),
        routes = authorizer.routes().entries().len(),
        resolve_timeout = ?config.auth.resolve_timeout,
        "Policy loaded"
    );

    let layer = AuthorizeLayer::new(authorizer, resolver)
        .with_header(config.auth.bearer_header.clone())
        .with_resolve_timeout(config.auth.resolve_timeout);

    let state = AppState::new(demo_threat_models()).with_metrics(handle.metrics);
    let app = api::build_router(state, layer);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server.host / server.port")?;
    tracing::info!(address = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

fn demo_threat_models() -> Vec<ThreatModel> {
    vec![
        ThreatModel::new(
            "tm-1",
            "Payment gateway",
            ResourceOwner::new("u-alice").in_organization("acme"),
        ),
        ThreatModel::new(
            "tm-2",
            "Partner SSO",
            ResourceOwner::new("u-bob").in_organization("acme"),
        ),
        ThreatModel::new(
            "tm-3",
            "Mobile backend",
            ResourceOwner::new("u-carol").in_organization("globex"),
        ),
        ThreatModel::new("tm-4", "Personal blog", ResourceOwner::new("u-dave")),
    ]
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received");
}
