//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Link resolution (outcomes per provider, submissions)
//! - Torrent relevance filtering
//! - External services (Nyaa, debrid providers)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Resolution Metrics
// =============================================================================

/// Resolutions finished, by provider and final status.
pub static RESOLUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("kaistream_resolutions_total", "Total link resolutions"),
        &["provider", "status"], // "completed", "downloading", "error", "not_found"
    )
    .unwrap()
});

/// Resolution duration in seconds.
pub static RESOLUTION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "kaistream_resolution_duration_seconds",
            "Duration of a full link resolution",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0]),
        &["provider"],
    )
    .unwrap()
});

/// Fire-and-forget submissions, by provider and result.
pub static SUBMISSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "kaistream_submissions_total",
            "Torrents submitted to a debrid provider",
        ),
        &["provider", "result"], // "accepted", "failed"
    )
    .unwrap()
});

// =============================================================================
// Torrent Filter Metrics
// =============================================================================

/// Torrent candidates by filter outcome.
pub static TORRENT_FILTER_RESULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "kaistream_torrent_filter_results_total",
            "Torrent candidates by relevance filter outcome",
        ),
        &["outcome"], // "kept", "rejected", "fetch_failed"
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External request duration in seconds.
pub static EXTERNAL_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "kaistream_external_request_duration_seconds",
            "Duration of calls to external services",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service"], // "nyaa", "realdebrid", "alldebrid", "torbox"
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(RESOLUTIONS.clone()),
        Box::new(RESOLUTION_DURATION.clone()),
        Box::new(SUBMISSIONS.clone()),
        Box::new(TORRENT_FILTER_RESULTS.clone()),
        Box::new(EXTERNAL_REQUEST_DURATION.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_registers_cleanly() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        RESOLUTIONS.with_label_values(&["realdebrid", "completed"]).inc();
        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert!(names.contains(&"kaistream_resolutions_total".to_string()));
    }
}
