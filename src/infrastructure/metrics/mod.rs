// Two Metrics backends: a global-registry Prometheus exporter and a no-op
// used when metrics are disabled.

pub mod noop;
pub mod prometheus;

pub use noop::create as create_noop_metrics;
pub use prometheus::create as create_prom_metrics;
