//! Prometheus metrics helpers for opentrack.
//!
//! # Usage
//!
//! ```rust,ignore
//! use opentrack_core::metrics::{init_metrics, start_metrics_server};
//!
//! let handle = init_metrics();
//! start_metrics_server(9091, handle).await?;
//!
//! opentrack_core::metrics::increment(opentrack_core::metrics::PIXELS_SERVED, 1);
//! ```
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests can record freely.
//!
//! # Metric Naming Conventions
//!
//! - Prefix: `tracker_`
//! - Suffix: unit or type (`_total`, `_seconds`)

use std::net::SocketAddr;

use axum::{Router, routing::get};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const PIXELS_SERVED: &str = "tracker_pixels_served_total";
pub const EVENTS_ENQUEUED: &str = "tracker_events_enqueued_total";
pub const EVENTS_REJECTED: &str = "tracker_events_rejected_total";
pub const EVENTS_WRITTEN: &str = "tracker_events_written_total";
pub const WRITE_ERRORS: &str = "tracker_write_errors_total";
pub const PROXY_OPENS: &str = "tracker_proxy_opens_total";
pub const CORRUPT_LINES: &str = "tracker_log_corrupt_lines_total";
pub const STATUS_QUERIES: &str = "tracker_status_queries_total";
pub const SCAN_DURATION: &str = "tracker_log_scan_duration_seconds";

/// Initialize the Prometheus metrics recorder.
///
/// Returns `None` if a recorder is already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder().ok()?;
    register_metrics();
    Some(handle)
}

/// Start the Prometheus metrics HTTP server.
///
/// Serves `/metrics` on the given port. Binding happens before returning so
/// a port conflict surfaces as an error; serving runs in a background task.
pub async fn start_metrics_server(
    port: u16,
    handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on http://{}/metrics", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "metrics server stopped");
        }
    });

    Ok(())
}

fn register_metrics() {
    describe_counter!(PIXELS_SERVED, "Tracking pixels served");
    describe_counter!(
        EVENTS_ENQUEUED,
        "Open events handed to the recorder queue"
    );
    describe_counter!(
        EVENTS_REJECTED,
        "Pixel requests not recorded because the identifier policy rejected them"
    );
    describe_counter!(EVENTS_WRITTEN, "Open events appended to the event log");
    describe_counter!(
        WRITE_ERRORS,
        "Open events dropped because the append failed"
    );
    describe_counter!(
        PROXY_OPENS,
        "Recorded opens classified as automated mail-proxy fetches"
    );
    describe_counter!(
        CORRUPT_LINES,
        "Malformed event log lines skipped while scanning"
    );
    describe_counter!(STATUS_QUERIES, "Status queries answered");
    describe_histogram!(SCAN_DURATION, "Time spent scanning the event log");
}

/// Increment a counter.
#[inline]
pub fn increment(name: &'static str, count: u64) {
    metrics::counter!(name).increment(count);
}

/// Record one histogram observation in seconds.
#[inline]
pub fn observe_seconds(name: &'static str, seconds: f64) {
    metrics::histogram!(name).record(seconds);
}
