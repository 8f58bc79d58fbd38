//! HTTP listener for the proxy
//!
//! The router has no routes of its own: every method and path falls through
//! to [`dispatch::dispatch`], which owns route precedence.

pub mod dispatch;

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::registry::{HttpTransport, Transport};
use axum::Router;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Immutable state shared by all requests
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub transport: Arc<dyn Transport>,
}

impl AppState {
    pub fn new(config: ProxyConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    /// State with the default reqwest transport
    pub fn from_config(config: ProxyConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::new(config, transport))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new().fallback(handle).with_state(state)
}

async fn handle(State(state): State<AppState>, request: Request) -> Response {
    let span = tracing::info_span!(
        "request",
        id = %Uuid::new_v4(),
        method = %request.method(),
        path = %request.uri().path(),
    );

    async move {
        match dispatch::dispatch(&state, request).await {
            Ok(response) => {
                tracing::debug!(status = %response.status(), "request complete");
                response
            }
            Err(e) => e.into_response(),
        }
    }
    .instrument(span)
    .await
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(config: ProxyConfig) -> Result<()> {
    let listen = config.listen;
    let state = AppState::from_config(config)?;

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| ProxyError::Configuration(format!("Failed to bind {}: {}", listen, e)))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
