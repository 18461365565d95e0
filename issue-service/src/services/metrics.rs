//! Prometheus export and the service's own counters.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub const MONITORS_ADDED: &str = "issue_monitors_added_total";
pub const MONITOR_CANDIDATES_SKIPPED: &str = "issue_monitor_candidates_skipped_total";

/// Install the Prometheus recorder. Call once at startup.
pub fn init_metrics() {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }

    metrics::describe_counter!(MONITORS_ADDED, "Users newly registered as issue monitors");
    metrics::describe_counter!(
        MONITOR_CANDIDATES_SKIPPED,
        "Monitor candidates dropped during validation, by reason"
    );
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}
