use std::net::SocketAddr;

// ── Booking flow ────────────────────────────────────────────────

/// Counter: bookings admitted.
pub const BOOKINGS_ADMITTED_TOTAL: &str = "turfslot_bookings_admitted_total";

/// Counter: bookings cancelled.
pub const BOOKINGS_CANCELLED_TOTAL: &str = "turfslot_bookings_cancelled_total";

/// Counter: refused bookings and cancellations. Labels: op, reason.
pub const REJECTIONS_TOTAL: &str = "turfslot_rejections_total";

/// Histogram: admission latency in seconds, lock wait and fsync included.
pub const ADMISSION_DURATION_SECONDS: &str = "turfslot_admission_duration_seconds";

/// Counter: availability grid queries.
pub const GRID_QUERIES_TOTAL: &str = "turfslot_grid_queries_total";

// ── Journal ─────────────────────────────────────────────────────

/// Histogram: group-commit duration in seconds.
pub const JOURNAL_COMMIT_DURATION_SECONDS: &str = "turfslot_journal_commit_duration_seconds";

/// Histogram: events per group commit.
pub const JOURNAL_BATCH_SIZE: &str = "turfslot_journal_batch_size";

/// Counter: completed journal compactions.
pub const JOURNAL_COMPACTIONS_TOTAL: &str = "turfslot_journal_compactions_total";

/// Install the Prometheus exporter on `port`. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
