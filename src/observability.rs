//! Metric name constants and Prometheus exporter wiring.

use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total queries answered. Labels: modifier.
pub const QUERIES_TOTAL: &str = "itd_queries_total";

/// Histogram: query latency in seconds.
pub const QUERY_DURATION_SECONDS: &str = "itd_query_duration_seconds";

/// Counter: ingest lines processed. Labels: status (applied, dropped).
pub const INGEST_LINES_TOTAL: &str = "itd_ingest_lines_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active Unix-socket connections.
pub const CONNECTIONS_ACTIVE: &str = "itd_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "itd_connections_total";

/// Install the Prometheus metrics exporter on the given port. No-op if `port`
/// is `None`, matching the daemon's optional `--metrics-port` flag.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
