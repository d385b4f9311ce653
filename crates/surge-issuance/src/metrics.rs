//! Observability metrics for the issuance domain.
//!
//! This module provides Prometheus-compatible metrics for monitoring the
//! claim path and the reconciliation sweep. Metrics are designed to
//! support:
//!
//! - **Alerting**: SLO-based alerts on claim latency and sweep failures
//! - **Dashboards**: Real-time visibility into admission pressure
//! - **Debugging**: Correlating rejection spikes with quota exhaustion
//!
//! ## Metrics Exported
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `surge_claims_total` | Counter | `outcome` | Claim attempts by outcome |
//! | `surge_claim_duration_seconds` | Histogram | - | Claim-path latency |
//! | `surge_quota_cache_fills_total` | Counter | `result` | Quota cache lookups by result |
//! | `surge_sweep_runs_total` | Counter | `scope`, `status` | Sweep runs by scope kind and status |
//! | `surge_sweep_records_total` | Counter | `result` | Swept records by result |
//! | `surge_sweep_duration_seconds` | Histogram | - | Sweep run duration |
//!
//! ## Integration
//!
//! Metrics are exposed via the `metrics` crate facade. To export to
//! Prometheus:
//!
//! ```rust,ignore
//! use metrics_exporter_prometheus::PrometheusBuilder;
//!
//! PrometheusBuilder::new()
//!     .with_http_listener(([0, 0, 0, 0], 9090))
//!     .install()
//!     .expect("failed to install Prometheus recorder");
//! ```

use metrics::{counter, histogram};

use crate::reconcile::SweepSummary;

/// Metric names as constants for consistency.
pub mod names {
    /// Counter: Claim attempts by outcome.
    pub const CLAIMS_TOTAL: &str = "surge_claims_total";
    /// Histogram: Claim-path latency in seconds.
    pub const CLAIM_DURATION_SECONDS: &str = "surge_claim_duration_seconds";
    /// Counter: Quota cache lookups by result.
    pub const QUOTA_CACHE_FILLS_TOTAL: &str = "surge_quota_cache_fills_total";
    /// Counter: Sweep runs by scope kind and status.
    pub const SWEEP_RUNS_TOTAL: &str = "surge_sweep_runs_total";
    /// Counter: Swept records by result.
    pub const SWEEP_RECORDS_TOTAL: &str = "surge_sweep_records_total";
    /// Histogram: Sweep run duration in seconds.
    pub const SWEEP_DURATION_SECONDS: &str = "surge_sweep_duration_seconds";
}

/// Label keys used across metrics.
pub mod labels {
    /// Claim outcome (accepted, already_claimed, quota_exhausted, ...).
    pub const OUTCOME: &str = "outcome";
    /// Result status (hit, miss, persisted, failed, ...).
    pub const RESULT: &str = "result";
    /// Sweep scope kind (day, coupon).
    pub const SCOPE: &str = "scope";
    /// Sweep run status (completed, contended).
    pub const STATUS: &str = "status";
}

/// High-level interface for recording issuance metrics.
///
/// Cheap to clone and share across tasks.
#[derive(Debug, Clone, Default)]
pub struct IssuanceMetrics {
    _private: (),
}

impl IssuanceMetrics {
    /// Creates a new metrics recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one claim attempt by outcome.
    pub fn record_claim(&self, outcome: &str) {
        counter!(
            names::CLAIMS_TOTAL,
            labels::OUTCOME => outcome.to_string(),
        )
        .increment(1);
    }

    /// Records claim-path latency.
    pub fn observe_claim_duration(&self, duration_secs: f64) {
        histogram!(names::CLAIM_DURATION_SECONDS).record(duration_secs);
    }

    /// Records one quota cache lookup by result.
    pub fn record_quota_fill(&self, result: &str) {
        counter!(
            names::QUOTA_CACHE_FILLS_TOTAL,
            labels::RESULT => result.to_string(),
        )
        .increment(1);
    }

    /// Records one sweep run by scope kind and status.
    pub fn record_sweep_run(&self, scope: &str, status: &str) {
        counter!(
            names::SWEEP_RUNS_TOTAL,
            labels::SCOPE => scope.to_string(),
            labels::STATUS => status.to_string(),
        )
        .increment(1);
    }

    /// Records the per-record outcome counts of a completed sweep.
    pub fn record_sweep_outcome(&self, summary: &SweepSummary) {
        let results = [
            ("persisted", summary.persisted),
            ("skipped_existing", summary.skipped_existing),
            ("skipped_out_of_window", summary.skipped_out_of_window),
            ("failed", summary.failed),
        ];
        for (result, count) in results {
            if count > 0 {
                counter!(
                    names::SWEEP_RECORDS_TOTAL,
                    labels::RESULT => result.to_string(),
                )
                .increment(count as u64);
            }
        }
    }

    /// Records sweep run duration.
    pub fn observe_sweep_duration(&self, duration_secs: f64) {
        histogram!(names::SWEEP_DURATION_SECONDS).record(duration_secs);
    }
}
