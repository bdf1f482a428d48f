// Session metrics
//
// Lightweight counters for conversions and downloads, logged on shutdown.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Session-wide counters
///
/// Uses atomic operations so the orchestrator, the distributor and the UI
/// thread can all record without taking a lock.
#[derive(Debug)]
pub struct Metrics {
    /// Submissions that reached the conversion service
    pub submissions_started: AtomicUsize,

    pub conversions_succeeded: AtomicUsize,

    /// Rejections, transport failures and validation refusals
    pub conversions_failed: AtomicUsize,

    /// Submit requests ignored because nothing was pending or a request was in flight
    pub submissions_skipped: AtomicUsize,

    /// Individual `.tex` files written to disk
    pub artifacts_saved: AtomicUsize,

    pub bundles_saved: AtomicUsize,
    pub bundles_failed: AtomicUsize,

    /// Time spent waiting on the service, in milliseconds
    pub total_request_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            submissions_started: AtomicUsize::new(0),
            conversions_succeeded: AtomicUsize::new(0),
            conversions_failed: AtomicUsize::new(0),
            submissions_skipped: AtomicUsize::new(0),
            artifacts_saved: AtomicUsize::new(0),
            bundles_saved: AtomicUsize::new(0),
            bundles_failed: AtomicUsize::new(0),
            total_request_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_submission_started(&self) {
        self.submissions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conversion_succeeded(&self) {
        self.conversions_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conversion_failed(&self) {
        self.conversions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submission_skipped(&self) {
        self.submissions_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_artifact_saved(&self) {
        self.artifacts_saved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bundle_saved(&self) {
        self.bundles_saved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bundle_failed(&self) {
        self.bundles_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record how long one service round trip took
    pub fn record_request_time(&self, duration: Duration) {
        self.total_request_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average round trip per submission in milliseconds
    pub fn avg_request_time_ms(&self) -> f64 {
        let total = self.total_request_time_ms.load(Ordering::Relaxed);
        let count = self.submissions_started.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        let uptime = self.uptime();
        tracing::info!("=== Session Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", uptime.as_secs_f64());
        tracing::info!(
            "Conversions: {} started, {} succeeded, {} failed, {} skipped",
            self.submissions_started.load(Ordering::Relaxed),
            self.conversions_succeeded.load(Ordering::Relaxed),
            self.conversions_failed.load(Ordering::Relaxed),
            self.submissions_skipped.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Service time: {:.2}s (avg: {:.2}ms per request)",
            self.total_request_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_request_time_ms()
        );
        tracing::info!(
            "Downloads: {} files, {} archives ({} failed)",
            self.artifacts_saved.load(Ordering::Relaxed),
            self.bundles_saved.load(Ordering::Relaxed),
            self.bundles_failed.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
