//! Observability infrastructure for the dashboard pipeline
//!
//! Provides:
//! - Prometheus metrics (poll latency, failures, discarded stale results,
//!   unknown workload kinds)
//! - Text exposition of those metrics
//! - Tracing subscriber setup shared by the binaries

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::str::FromStr;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Histogram buckets for poll round-trips (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<DashboardMetricsInner> = OnceLock::new();

struct DashboardMetricsInner {
    poll_latency_seconds: HistogramVec,
    poll_failures: IntCounterVec,
    commits: IntCounterVec,
    stale_results_discarded: IntCounterVec,
    unknown_workload_kinds: IntCounter,
}

impl DashboardMetricsInner {
    fn new() -> Self {
        Self {
            poll_latency_seconds: register_histogram_vec!(
                "kdd_poll_latency_seconds",
                "Time from issuing a poll to its completion",
                &["view"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register poll_latency_seconds"),

            poll_failures: register_int_counter_vec!(
                "kdd_poll_failures_total",
                "Polls that ended with a transport or decode error",
                &["view"]
            )
            .expect("Failed to register poll_failures"),

            commits: register_int_counter_vec!(
                "kdd_commits_total",
                "Poll results committed to view state",
                &["view"]
            )
            .expect("Failed to register commits"),

            stale_results_discarded: register_int_counter_vec!(
                "kdd_stale_results_discarded_total",
                "Poll results dropped because a newer result was already committed",
                &["view"]
            )
            .expect("Failed to register stale_results_discarded"),

            unknown_workload_kinds: register_int_counter!(
                "kdd_unknown_workload_kinds_total",
                "Workloads skipped because their kind is not in the registry"
            )
            .expect("Failed to register unknown_workload_kinds"),
        }
    }
}

/// Handle to the process-wide dashboard metrics.
///
/// Clones share the same underlying Prometheus collectors.
#[derive(Clone)]
pub struct DashboardMetrics {
    _private: (),
}

impl Default for DashboardMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(DashboardMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &DashboardMetricsInner {
        GLOBAL_METRICS.get_or_init(DashboardMetricsInner::new)
    }

    pub fn observe_poll_latency(&self, view: &str, duration_secs: f64) {
        self.inner()
            .poll_latency_seconds
            .with_label_values(&[view])
            .observe(duration_secs);
    }

    pub fn inc_poll_failures(&self, view: &str) {
        self.inner().poll_failures.with_label_values(&[view]).inc();
    }

    pub fn inc_commits(&self, view: &str) {
        self.inner().commits.with_label_values(&[view]).inc();
    }

    pub fn inc_stale_discarded(&self, view: &str) {
        self.inner()
            .stale_results_discarded
            .with_label_values(&[view])
            .inc();
    }

    pub fn inc_unknown_kinds(&self) {
        self.inner().unknown_workload_kinds.inc();
    }

    pub fn unknown_kinds(&self) -> u64 {
        self.inner().unknown_workload_kinds.get()
    }

    /// Every registered metric in the Prometheus text exposition format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        self.inner();

        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Serializes tests that read or bump the process-wide unknown-kind counter
#[cfg(test)]
pub(crate) fn unknown_kinds_guard() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_level` when set. Logs go to stderr so that
/// table or JSON output on stdout stays clean.
pub fn init_tracing(format: LogFormat, default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {e}");
    }
}
