//! Prometheus metrics for monitoring attendance traffic and the face service.
//!
//! Metrics are exposed in Prometheus text format on a separate listener
//! (`METRICS_BIND`). Without an installed recorder every call is a no-op.
//!
//! # Metrics
//!
//! - `http_requests_total{method,status}`
//! - `attendance_attempts_total{type,outcome}`
//! - `face_service_calls_total{operation,result}`
//! - `face_service_duration_ms{operation}`
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use gp_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", 200);
//! metrics::attendance_attempts_total("checkin", "admitted");
//! ```

use async_trait::async_trait;
use geo_presence::face::{
    Embedding, FaceError, FaceImage, FaceResult, FaceScorer, FaceTemplate, VerifyOutcome,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, sync::Arc, time::Instant};

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Attendance Metrics
// ============================================================================

/// Record an attendance attempt; `outcome` is `admitted` or an error kind.
pub fn attendance_attempts_total(kind: &str, outcome: &str) {
    metrics::counter!("attendance_attempts_total",
        "type" => kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

// ============================================================================
// Face Service Metrics
// ============================================================================

/// Record one call to the scoring service.
pub fn face_service_call(operation: &'static str, result: &'static str, duration_ms: f64) {
    metrics::counter!("face_service_calls_total",
        "operation" => operation,
        "result" => result
    )
    .increment(1);
    metrics::histogram!("face_service_duration_ms", "operation" => operation).record(duration_ms);
}

fn result_label<T>(result: &FaceResult<T>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(FaceError::Rejected(_)) => "rejected",
        Err(FaceError::Unavailable(_)) => "unavailable",
        Err(_) => "error",
    }
}

/// [`FaceScorer`] decorator that records call counts and latency
pub struct InstrumentedScorer {
    inner: Arc<dyn FaceScorer>,
}

impl InstrumentedScorer {
    pub fn new(inner: Arc<dyn FaceScorer>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl FaceScorer for InstrumentedScorer {
    async fn embed(&self, image: &FaceImage) -> FaceResult<Embedding> {
        let started = Instant::now();
        let result = self.inner.embed(image).await;
        face_service_call("embed", result_label(&result), elapsed_ms(started));
        result
    }

    async fn verify(
        &self,
        image: &FaceImage,
        templates: &[FaceTemplate],
        threshold: f64,
    ) -> FaceResult<VerifyOutcome> {
        let started = Instant::now();
        let result = self.inner.verify(image, templates, threshold).await;
        face_service_call("verify", result_label(&result), elapsed_ms(started));
        result
    }

    async fn health(&self) -> FaceResult<()> {
        let started = Instant::now();
        let result = self.inner.health().await;
        face_service_call("health", result_label(&result), elapsed_ms(started));
        result
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
