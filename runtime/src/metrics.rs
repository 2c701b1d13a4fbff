//! Prometheus metrics for the ticket pipeline.
//!
//! Metric names are constants so call sites and dashboards agree. The
//! recorder is installed once by the server; without it the macros are
//! no-ops, which is what unit tests rely on.
//!
//! # Example
//!
//! ```rust,no_run
//! use ticket_history_runtime::metrics::install_prometheus;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = install_prometheus()?;
//! println!("{}", handle.render());
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Tickets created.
pub const TICKETS_CREATED_TOTAL: &str = "ticket_history_tickets_created_total";
/// Tickets updated.
pub const TICKETS_UPDATED_TOTAL: &str = "ticket_history_tickets_updated_total";
/// Notification attempts by sink and outcome.
pub const NOTIFICATIONS_TOTAL: &str = "ticket_history_notifications_total";
/// Notification latency by sink.
pub const NOTIFICATION_DURATION_SECONDS: &str = "ticket_history_notification_duration_seconds";

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Install the global Prometheus recorder and return its render handle.
///
/// # Errors
///
/// Returns [`MetricsError`] if the exporter cannot be built or a recorder is
/// already installed.
pub fn install_prometheus() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    register_metrics();
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(TICKETS_CREATED_TOTAL, "Total number of tickets created");
    describe_counter!(TICKETS_UPDATED_TOTAL, "Total number of accepted ticket updates");
    describe_counter!(
        NOTIFICATIONS_TOTAL,
        "Change notifications by sink and outcome (delivered, failed, timed_out)"
    );
    describe_histogram!(
        NOTIFICATION_DURATION_SECONDS,
        "Time spent delivering a change notification"
    );
}
