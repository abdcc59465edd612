//! Prometheus Metrics Definitions
//!
//! Defines the gateway metrics with their labels and types.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

use crate::error::{ApiError, ApiResult};

/// Store call latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s
const STORE_LATENCY_BUCKETS: &[f64] =
    &[0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0];

/// Global metrics instance - initialized on first use
pub static METRICS: Lazy<ApiResult<GatewayMetrics>> = Lazy::new(GatewayMetrics::new);

/// The registered metrics, or `None` if registration failed.
pub fn metrics() -> Option<&'static GatewayMetrics> {
    METRICS.as_ref().ok()
}

/// Container for all gateway metrics.
#[derive(Clone)]
pub struct GatewayMetrics {
    /// Request outcomes - labels: endpoint, outcome, class
    pub outcomes_total: CounterVec,

    /// Admission decisions - labels: step, admission
    pub admissions_total: CounterVec,

    /// Store calls - labels: store, operation, status
    pub store_calls_total: CounterVec,

    /// Store call duration histogram - labels: store, operation
    pub store_call_duration_seconds: HistogramVec,
}

impl GatewayMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            outcomes_total: register_counter_vec!(
                "datagate_outcomes_total",
                "Total number of request outcomes",
                &["endpoint", "outcome", "class"]
            )
            .map_err(|e| registration_error("outcomes_total", e))?,

            admissions_total: register_counter_vec!(
                "datagate_admissions_total",
                "Total number of admission decisions on cache misses",
                &["step", "admission"]
            )
            .map_err(|e| registration_error("admissions_total", e))?,

            store_calls_total: register_counter_vec!(
                "datagate_store_calls_total",
                "Total number of cache store and job queue calls",
                &["store", "operation", "status"]
            )
            .map_err(|e| registration_error("store_calls_total", e))?,

            store_call_duration_seconds: register_histogram_vec!(
                "datagate_store_call_duration_seconds",
                "Cache store and job queue call duration in seconds",
                &["store", "operation"],
                STORE_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("store_call_duration_seconds", e))?,
        })
    }

    /// Record the outcome of one request. `class` is empty for non-errors.
    pub fn record_outcome(&self, endpoint: &str, outcome: &str, class: &str) {
        self.outcomes_total
            .with_label_values(&[endpoint, outcome, class])
            .inc();
    }

    pub fn record_admission(&self, step: &str, admission: &str) {
        self.admissions_total
            .with_label_values(&[step, admission])
            .inc();
    }

    /// Record a store call. `status` is one of success, error, timeout.
    pub fn record_store_call(&self, store: &str, operation: &str, status: &str, duration_secs: f64) {
        self.store_calls_total
            .with_label_values(&[store, operation, status])
            .inc();
        self.store_call_duration_seconds
            .with_label_values(&[store, operation])
            .observe(duration_secs);
    }
}

fn registration_error(name: &str, err: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Collector;

    #[test]
    fn test_metrics_creation() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        assert!(!metrics.outcomes_total.desc().is_empty());
        Ok(())
    }

    #[test]
    fn test_record_store_call() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        let before = metrics
            .store_calls_total
            .with_label_values(&["cache", "get", "timeout"])
            .get();
        metrics.record_store_call("cache", "get", "timeout", 2.0);
        let after = metrics
            .store_calls_total
            .with_label_values(&["cache", "get", "timeout"])
            .get();
        assert!(after > before);
        Ok(())
    }
}
