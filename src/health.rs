//! Minimal Kubernetes health surface every daemon binary exposes.
//!
//! Kubernetes and Prometheus themselves are external collaborators this
//! crate never reimplements, but the ambient `/healthz` route a `preStop`
//! hook probes is carried regardless, using the same `axum::Router`
//! pattern every daemon binary's HTTP surface follows.

use axum::Router;
use axum::routing::get;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// Shared readiness flag a daemon's main loop flips once it has completed
/// its first successful cycle, and flips back off once `SigDown` begins
/// draining — a `preStopPort` probe sees `503` during drain instead of a
/// connection that silently never answers.
#[derive(Clone, Default)]
pub struct HealthState {
    ready: Arc<AtomicBool>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

async fn healthz(
    axum::extract::State(state): axum::extract::State<HealthState>,
) -> (axum::http::StatusCode, &'static str) {
    if state.is_ready() {
        (axum::http::StatusCode::OK, "ok")
    } else {
        (axum::http::StatusCode::SERVICE_UNAVAILABLE, "draining")
    }
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the health router to `127.0.0.1:port` and serves it until
/// `cancellation_token` fires, matching the `preStopPort` contract: a k8s
/// `preStop` hook probes this port before SIGTERM is sent, so the route
/// only needs to answer truthfully, not do real work.
pub async fn serve(port: u16, state: HealthState, cancellation_token: CancellationToken) -> std::io::Result<()> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "health server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancellation_token.cancelled().await })
        .await
}
