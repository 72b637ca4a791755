//! HTTP server for the Prometheus metrics endpoint.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus_client::encoding::text::encode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use watchdog::MetricsRegistry;

/// Serves `/metrics` from a shared registry
pub struct MetricsServer {
    registry: Arc<MetricsRegistry>,
    listen_addr: String,
}

impl MetricsServer {
    pub fn new(registry: Arc<MetricsRegistry>, listen_addr: String) -> Self {
        Self {
            registry,
            listen_addr,
        }
    }

    pub fn listen_addr(&self) -> &str {
        &self.listen_addr
    }

    fn router(registry: Arc<MetricsRegistry>) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(registry)
    }

    /// Bind and serve until the listener fails
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.listen_addr).await?;
        info!(listen_addr = %self.listen_addr, "Metrics server listening");

        axum::serve(listener, Self::router(self.registry)).await?;
        Ok(())
    }
}

async fn metrics_handler(State(registry): State<Arc<MetricsRegistry>>) -> Response {
    let mut buffer = String::new();
    if let Err(e) = encode(&mut buffer, &registry.registry) {
        warn!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        buffer,
    )
        .into_response()
}
