pub mod routes;

use crate::config::Config;
use anyhow::{Context, Result};
use axum::Router;
use axum::http::HeaderValue;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

pub async fn run_server(config: Arc<Config>) -> Result<()> {
    let addr = config.bind_address()?;
    let app = app(Arc::clone(&config))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API server: {addr}"))?;

    info!(address = %addr, db = %config.db_path.display(), "HeatmapTracker API server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("HeatmapTracker API server stopped");
    Ok(())
}

/// Resolves on Ctrl+C. In-flight requests finish before `run_server` returns.
async fn shutdown_signal() {
    if let Err(error) = signal::ctrl_c().await {
        warn!(error = %error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Full application: API routes plus the configured cross-origin policy.
pub fn app(config: Arc<Config>) -> Result<Router> {
    let cors = cors_layer(&config.allowed_origins)?;
    let router = routes::router(routes::ApiState { config });

    Ok(match cors {
        Some(layer) => router.layer(layer),
        None => router,
    })
}

/// `None` means no cross-origin access is granted at all.
pub fn cors_layer(allowed_origins: &[String]) -> Result<Option<CorsLayer>> {
    if allowed_origins.is_empty() {
        info!("cross-origin access disabled");
        return Ok(None);
    }

    let allow_origin = if allowed_origins.iter().any(|origin| origin == "*") {
        warn!("cross-origin access open to any origin; narrow allowed_origins for production");
        AllowOrigin::any()
    } else {
        let origins = allowed_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .with_context(|| format!("Invalid allowed origin: {origin}"))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(Any)
            .allow_headers(Any),
    ))
}
