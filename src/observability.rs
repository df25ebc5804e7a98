use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total HTTP requests served. Labels: route, status.
pub const REQUESTS_TOTAL: &str = "hallsched_requests_total";

/// Histogram: request latency in seconds. Labels: route.
pub const REQUEST_DURATION_SECONDS: &str = "hallsched_request_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Counter: requests turned away because the in-flight limit was reached.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "hallsched_connections_rejected_total";

/// Counter: requests without a valid bearer token.
pub const AUTH_FAILURES_TOTAL: &str = "hallsched_auth_failures_total";

// ── Scheduler ───────────────────────────────────────────────────

/// Counter: bookings admitted.
pub const BOOKINGS_ADMITTED_TOTAL: &str = "hallsched_bookings_admitted_total";

/// Counter: booking requests refused because the slot was taken.
pub const BOOKING_CONFLICTS_TOTAL: &str = "hallsched_booking_conflicts_total";

/// Counter: journal compactions performed.
pub const COMPACTIONS_TOTAL: &str = "hallsched_compactions_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "hallsched_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "hallsched_wal_flush_batch_size";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
/// A failed install is logged and the server keeps running without metrics.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    match metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        Ok(()) => tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics"),
        Err(e) => tracing::error!("failed to install Prometheus metrics exporter: {e}"),
    }
}
