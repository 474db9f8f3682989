use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder globally and keeps the handle.
///
/// Idempotent: the recorder is process-global, so routers built after the
/// first reuse the existing handle. Installation failure downgrades to a
/// warning and `/metrics` renders empty.
pub fn init_metrics() {
    // ---
    if HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            // A concurrent initializer may have won the set; either handle
            // renders from the same global registry.
            let _ = HANDLE.set(handle);
        }
        Err(err) => {
            tracing::warn!("failed to install Prometheus recorder: {}", err);
        }
    }
}

/// Render the current metrics in Prometheus text format.
pub fn render_metrics() -> String {
    // ---
    HANDLE.get().map(PrometheusHandle::render).unwrap_or_default()
}
