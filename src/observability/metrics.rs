//! Metrics collection and exposition.
//!
//! # Metrics
//! - `docledger_requests_total` (counter): lifecycle operations by operation, outcome
//! - `docledger_submissions_total` (counter): broadcast transactions by method
//! - `docledger_confirmation_polls` (histogram): receipt polls per wait
//! - `docledger_orphaned_blobs_total` (counter): blobs left pinned without a
//!   ledger record, by stage
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter, so tests
//! and tools can call these freely.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome of a lifecycle operation (`register`, `lookup`, ...).
pub fn record_request(operation: &'static str, outcome: &str) {
    counter!(
        "docledger_requests_total",
        "operation" => operation,
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record one broadcast transaction.
pub fn record_submission(method: &str) {
    counter!("docledger_submissions_total", "method" => method.to_string()).increment(1);
}

/// Record how many receipt polls a wait took.
pub fn record_confirmation_polls(attempts: u32) {
    histogram!("docledger_confirmation_polls").record(attempts as f64);
}

/// Record a blob left in the store without a matching ledger record.
pub fn record_orphaned_blob(stage: &'static str) {
    counter!("docledger_orphaned_blobs_total", "stage" => stage).increment(1);
}
