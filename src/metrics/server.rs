//! HTTP server for the Prometheus metrics endpoint.

use super::{exposition, ExporterMetrics, SnapshotCache};
use crate::config::ServerConfig;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

/// Errors that can occur during metrics server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

/// Shared state for the metrics server.
pub struct MetricsState {
    cache: SnapshotCache,
    exporter: ExporterMetrics,
}

impl MetricsState {
    /// Creates server state reading from the given cache and registry.
    pub fn new(cache: SnapshotCache, exporter: ExporterMetrics) -> Self {
        Self { cache, exporter }
    }

    /// Renders the current snapshot followed by the exporter's own metrics.
    pub async fn render(&self) -> Result<String, super::MetricsError> {
        let mut output = match self.cache.latest().await {
            Some(snapshot) => exposition::render(&snapshot),
            None => String::new(),
        };
        output.push_str(&self.exporter.encode()?);
        Ok(output)
    }
}

/// HTTP server for exposing Prometheus metrics.
pub struct MetricsServer {
    config: ServerConfig,
    state: Arc<MetricsState>,
}

impl MetricsServer {
    /// Creates a new metrics server.
    pub fn new(config: ServerConfig, cache: SnapshotCache, exporter: ExporterMetrics) -> Self {
        Self {
            config,
            state: Arc::new(MetricsState::new(cache, exporter)),
        }
    }

    /// Builds the router serving `/metrics` and `/health`.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.state))
    }

    /// Starts the HTTP server.
    ///
    /// Runs until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!(
            addr = %self.config.bind_addr,
            "Metrics server listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        Ok(())
    }
}

/// Handler for the /metrics endpoint.
async fn metrics_handler(State(state): State<Arc<MetricsState>>) -> impl IntoResponse {
    match state.render().await {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
