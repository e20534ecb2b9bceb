use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Read-only process state exposed over the status endpoints.
#[derive(Clone)]
pub struct StatusState {
    pub upstreams: Arc<Vec<String>>,
    pub dns_listener: String,
    pub started_at: Instant,
}

/// Serve `/health` and `/status` on an already-bound listener. The listener is
/// bound by the caller so a bind failure can be made fatal before the DNS
/// listener comes up.
pub async fn start_status_server(
    listener: tokio::net::TcpListener,
    state: StatusState,
) -> anyhow::Result<()> {
    info!(bind_address = %listener.local_addr()?, "Starting status server");

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .with_state(state);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn status_handler(State(state): State<StatusState>) -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "dns_listener": state.dns_listener,
        "upstreams": state.upstreams.as_ref(),
    }))
}
