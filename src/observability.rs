use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: admission attempts. Labels: outcome.
pub const ADMISSIONS_TOTAL: &str = "amenity_admissions_total";

/// Histogram: admission latency in seconds.
pub const ADMISSION_DURATION_SECONDS: &str = "amenity_admission_duration_seconds";

/// Counter: successful lifecycle transitions. Labels: transition.
pub const TRANSITIONS_TOTAL: &str = "amenity_transitions_total";

/// Counter: availability queries served.
pub const SLOT_QUERIES_TOTAL: &str = "amenity_slot_queries_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: number of active tenants (loaded engines).
pub const TENANTS_ACTIVE: &str = "amenity_tenants_active";

/// Install Prometheus metrics exporter on the given port. No-op if port is
/// None.
pub fn init_metrics(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Stdout tracing subscriber for hosts embedding the engine.
pub fn init_tracing() {
    tracing_subscriber::fmt::init();
}
