//! Prometheus metrics implementation.
//!
//! Concrete implementation of the `Metrics` trait using the Prometheus
//! format. It delegates to utility functions in sibling modules
//! (`counters.rs`, `recorder.rs`) which handle the actual collection via
//! the global `metrics` crate registry.

use crate::domain::Metrics;
use std::time::Instant;

/// Prometheus-based metrics implementation.
///
/// Intentionally empty: metrics are registered globally through the
/// `metrics` crate macros, and the `PrometheusHandle` stored in
/// `recorder.rs` manages collection and rendering.
pub struct PrometheusMetrics {
    // Empty - uses global metrics registry pattern
}

impl PrometheusMetrics {
    pub fn new() -> Self {
        tracing::info!("Creating Prometheus metrics");
        PrometheusMetrics {}
    }
}

impl Metrics for PrometheusMetrics {
    fn render(&self) -> String {
        // ---
        super::render_metrics()
    }

    fn record_registration(&self) {
        // ---
        super::increment_registration();
    }

    fn record_login(&self) {
        // ---
        super::increment_login();
    }

    fn record_auth_failure(&self) {
        // ---
        super::increment_auth_failure();
    }

    fn record_http_request(&self, start: Instant, _path: &str, _method: &str, _status: u16) {
        // ---
        super::track_http_request(start);
    }
}
