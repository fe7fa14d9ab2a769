//! Prometheus metrics for expression evaluation
//!
//! Counters and histograms are registered in the default registry on first
//! use. Recording is opt-in through `evaluator.metrics_enabled`.

use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};

lazy_static! {
    // === Evaluation Counters ===

    /// Total function evaluations
    pub static ref EVALUATIONS_TOTAL: CounterVec = register_counter_vec!(
        "kuba_graphite_evaluations_total",
        "Total function evaluations",
        &["function", "status"]
    ).unwrap();

    /// Groups dropped by groupByNode after a failed sub-evaluation
    pub static ref GROUPS_DROPPED_TOTAL: CounterVec = register_counter_vec!(
        "kuba_graphite_groups_dropped_total",
        "Total groups dropped after a failed callback evaluation",
        &["function"]
    ).unwrap();

    // === Latency Histograms ===

    /// Function evaluation duration, nested calls included
    pub static ref EVALUATION_DURATION: HistogramVec = register_histogram_vec!(
        "kuba_graphite_evaluation_duration_seconds",
        "Function evaluation latency in seconds",
        &["function"],
        vec![0.00001, 0.0001, 0.001, 0.01, 0.1, 1.0]
    ).unwrap();

    // === Registry ===

    /// Registered function names, aliases included
    pub static ref REGISTERED_FUNCTIONS: Gauge = register_gauge!(
        "kuba_graphite_registered_functions",
        "Number of registered function names"
    ).unwrap();
}

/// Get metrics in Prometheus text format
pub fn gather_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    encoder.encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer)
        .map_err(|e| format!("Metrics contain invalid UTF-8: {}", e))
}

/// Record one function evaluation
#[inline]
pub fn record_evaluation(function: &str, success: bool, elapsed: Duration) {
    let status = if success { "success" } else { "error" };

    EVALUATIONS_TOTAL
        .with_label_values(&[function, status])
        .inc();

    EVALUATION_DURATION
        .with_label_values(&[function])
        .observe(elapsed.as_secs_f64());
}

/// Record a group dropped by a grouping function
#[inline]
pub fn record_dropped_group(function: &str) {
    GROUPS_DROPPED_TOTAL
        .with_label_values(&[function])
        .inc();
}

/// Update the registered function count
#[inline]
pub fn update_registered_functions(count: usize) {
    REGISTERED_FUNCTIONS.set(count as f64);
}
