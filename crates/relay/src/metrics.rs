//! Liveness and `/metrics` endpoints (§4.7 ambient stack), served on their
//! own task alongside the extractor/pending-pool loops.

use {
    axum::{extract::State, response::IntoResponse, routing::get, Router},
    prometheus::{Encoder, IntCounter, Registry, TextEncoder},
    std::{net::SocketAddr, sync::Arc},
};

/// Relay-wide counters (§4.7 "one `Metrics` struct per component", folded
/// into one struct here since the composition root is the only consumer).
#[derive(prometheus_metric_storage::MetricStorage)]
pub struct Metrics {
    /// Chain reorganizations detected and rolled back (§4.5/§4.2.6).
    pub forks_detected: IntCounter,
}

#[derive(Clone)]
struct AppState {
    registry: Arc<Registry>,
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let families = state.registry.gather();
    let mut buffer = Vec::new();
    if let Err(err) = TextEncoder::new().encode(&families, &mut buffer) {
        tracing::error!(%err, "failed to encode metrics");
        return (axum::http::StatusCode::INTERNAL_SERVER_ERROR, String::new());
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8_lossy(&buffer).into_owned(),
    )
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

/// Serves liveness and metrics until the process is killed; `run()`'s
/// caller races this against the extractor loops in [`crate::start`].
pub async fn serve(address: SocketAddr, registry: Arc<Registry>) -> anyhow::Result<()> {
    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(AppState { registry })
        .layer(tower_http::trace::TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!(%address, "serving metrics");
    axum::serve(listener, router).await?;
    Ok(())
}
