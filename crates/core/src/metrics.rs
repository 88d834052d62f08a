//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Stages (outcomes, durations)
//! - The external tool (attempts by result)
//! - Playlists (manifests written, cache write failures)

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

// =============================================================================
// Stages
// =============================================================================

/// Stage runs by stage name and result.
pub static STAGE_RESULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("finisher_stage_results_total", "Total stage runs"),
        &["stage", "result"], // "success", "failure"
    )
    .unwrap()
});

/// Stage duration in seconds.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "finisher_stage_duration_seconds",
            "Duration of a single stage run",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["stage"],
    )
    .unwrap()
});

// =============================================================================
// External tool
// =============================================================================

/// Tool attempts by result.
pub static TOOL_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("finisher_tool_attempts_total", "Total external tool attempts"),
        &["result"], // "success", "corruption", "failure", "not_found"
    )
    .unwrap()
});

// =============================================================================
// Playlists
// =============================================================================

pub static MANIFESTS_WRITTEN: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "finisher_manifests_written_total",
        "Total playlist manifests written",
    )
    .unwrap()
});

pub static CACHE_WRITE_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "finisher_cache_write_failures_total",
        "Completion cache writes that failed and were dropped",
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(STAGE_RESULTS.clone()),
        Box::new(STAGE_DURATION.clone()),
        Box::new(TOOL_ATTEMPTS.clone()),
        Box::new(MANIFESTS_WRITTEN.clone()),
        Box::new(CACHE_WRITE_FAILURES.clone()),
    ]
}

static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in all_metrics() {
        if let Err(e) = registry.register(metric) {
            tracing::warn!("Failed to register metric: {}", e);
        }
    }
    registry
});

/// Registry holding every core metric.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry().gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
