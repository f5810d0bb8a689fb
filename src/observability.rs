use std::net::SocketAddr;

// ── Request-driven metrics ──────────────────────────────────────

/// Counter: booking attempts. Labels: outcome
/// (`created`, `conflict`, `rejected`, `not_found`, `unavailable`).
pub const BOOKINGS_TOTAL: &str = "chairtime_bookings_total";

/// Counter: successful status transitions. Labels: status.
pub const STATUS_TRANSITIONS_TOTAL: &str = "chairtime_status_transitions_total";

/// Counter: availability lookups. Labels: result (`open`, `closed`).
pub const AVAILABILITY_QUERIES_TOTAL: &str = "chairtime_availability_queries_total";

// ── Storage metrics ─────────────────────────────────────────────

/// Counter: storage round trips abandoned after the configured timeout. Labels: op.
pub const STORAGE_TIMEOUTS_TOTAL: &str = "chairtime_storage_timeouts_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "chairtime_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "chairtime_wal_flush_batch_size";

/// Install the Prometheus exporter on `port`. No-op if `port` is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
