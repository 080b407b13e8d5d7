//! HTTP endpoint serving the gauges to a Prometheus scraper.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;

use crate::metrics::PaperlessMetrics;

/// Create the router: `GET /metrics` in the Prometheus text format.
pub fn create_router(metrics: Arc<PaperlessMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<Arc<PaperlessMetrics>>) -> Response {
    match metrics.export() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Serve `/metrics` on all interfaces until `shutdown` fires.
pub async fn serve(
    metrics: Arc<PaperlessMetrics>,
    port: u16,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let app = create_router(metrics);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Serving metrics at http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}
