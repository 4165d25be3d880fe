//! Completion proxy.
//!
//! Startup order:
//! 1. Build the provider client from configuration.
//! 2. Assemble the router with per-request tracing.
//! 3. Bind and serve until Ctrl-C or SIGTERM.

pub mod error;
pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::Request, Router};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::llm::LlmClient;
use crate::server::state::AppState;

/// Build the complete application router.
///
/// Every request gets a span carrying a fresh request id so the provider
/// error logged by the handler can be matched to its access log line.
pub fn app(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            info_span!(
                "request",
                id = %Uuid::new_v4(),
                method = %request.method(),
                uri = %request.uri(),
            )
        }))
        .with_state(state)
}

pub async fn serve(config: &Config) -> Result<()> {
    if config.provider.api_key.is_none() {
        warn!(
            env = %config.provider.api_key_env,
            "no provider API key configured; chat requests will fail"
        );
    }

    let provider = LlmClient::new(config.provider.clone())
        .context("Failed to create provider client")?;
    let state = AppState::new(Arc::new(provider));

    let addr: SocketAddr = config
        .server
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind_address))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(%addr, model = %config.provider.model, "chat proxy listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("chat proxy stopped");
    Ok(())
}

/// Resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}
