//! Reconcile metrics and the probe server.
//!
//! Serves `/healthz`, `/readyz` and `/metrics` (Prometheus text format).

use crate::error::TelemetryError;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Counters and latency histogram for reconciliations.
#[derive(Debug, Clone)]
pub struct ReconcileMetrics {
    reconciliations: IntCounterVec,
    duration: HistogramVec,
}

impl ReconcileMetrics {
    /// Creates the metrics and registers them with `registry`.
    pub fn register(registry: &Registry) -> Result<Self, TelemetryError> {
        let reconciliations = IntCounterVec::new(
            Opts::new("reconcile_total", "Reconciliations by controller and result"),
            &["controller", "result"],
        )?;
        let duration = HistogramVec::new(
            HistogramOpts::new("reconcile_duration_seconds", "Reconciliation latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["controller"],
        )?;
        registry.register(Box::new(reconciliations.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        Ok(Self { reconciliations, duration })
    }

    /// Records one finished reconciliation.
    pub fn observe(&self, controller: &str, started: Instant, success: bool) {
        let result = if success { "success" } else { "error" };
        self.reconciliations.with_label_values(&[controller, result]).inc();
        self.duration
            .with_label_values(&[controller])
            .observe(started.elapsed().as_secs_f64());
    }

    /// Count recorded for `controller` and `result` ("success" or "error").
    pub fn count(&self, controller: &str, result: &str) -> u64 {
        self.reconciliations.with_label_values(&[controller, result]).get()
    }
}

/// Readiness shared between the controllers and the probe server.
///
/// The process is ready once every expected controller has finished its
/// initial sync.
#[derive(Debug)]
pub struct ProbeState {
    expected: usize,
    synced: AtomicUsize,
}

impl ProbeState {
    /// Creates a state that becomes ready after `expected` controllers sync.
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            synced: AtomicUsize::new(0),
        }
    }

    /// Records that one controller finished its initial sync.
    pub fn mark_synced(&self) {
        self.synced.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.synced.load(Ordering::SeqCst) >= self.expected
    }
}

#[derive(Clone)]
struct ProbeContext {
    registry: Registry,
    state: Arc<ProbeState>,
}

/// Builds the probe router.
pub fn router(registry: Registry, state: Arc<ProbeState>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(ProbeContext { registry, state })
}

async fn readyz(State(ctx): State<ProbeContext>) -> impl IntoResponse {
    if ctx.state.is_ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

async fn metrics(State(ctx): State<ProbeContext>) -> impl IntoResponse {
    match TextEncoder::new().encode_to_string(&ctx.registry.gather()) {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}

/// Serves the probe endpoints until the process exits.
pub async fn serve(addr: SocketAddr, registry: Registry, state: Arc<ProbeState>) -> Result<(), TelemetryError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Probe server listening on {}", addr);
    axum::serve(listener, router(registry, state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_count_by_result() {
        let registry = Registry::new();
        let metrics = ReconcileMetrics::register(&registry).unwrap();

        metrics.observe("checkin", Instant::now(), true);
        metrics.observe("checkin", Instant::now(), true);
        metrics.observe("checkin", Instant::now(), false);

        assert_eq!(metrics.count("checkin", "success"), 2);
        assert_eq!(metrics.count("checkin", "error"), 1);
        assert_eq!(metrics.count("config-deploy", "success"), 0);
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        ReconcileMetrics::register(&registry).unwrap();
        assert!(matches!(
            ReconcileMetrics::register(&registry),
            Err(TelemetryError::Prometheus(_))
        ));
    }

    #[test]
    fn test_probe_state_waits_for_every_controller() {
        let state = ProbeState::new(2);
        assert!(!state.is_ready());
        state.mark_synced();
        assert!(!state.is_ready());
        state.mark_synced();
        assert!(state.is_ready());
    }
}
