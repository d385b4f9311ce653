//! The reconciliation sweep: ephemeral claims → durable records.
//!
//! The sweep discovers issuance stamps in the state store, promotes each
//! novel `(coupon, user)` pair to a durable [`ClaimRecord`], bulk-inserts
//! the batch, and only then deletes the processed staging keys. The claim
//! bitmap is never touched: it must keep rejecting re-claims for the
//! coupon's full retention window.
//!
//! ## Design Principles
//!
//! - **Idempotent**: Pairs already present in the durable store are
//!   skipped, so replaying a window produces no duplicates.
//! - **Partial-failure tolerant**: A malformed key or a failed per-pair
//!   lookup is counted and logged; it never aborts the sweep.
//! - **Safety over liveness**: Only a failed bulk insert aborts a run, and
//!   then the staging keys stay put so the next run retries the window.
//! - **Single-instance**: An advisory run lock in the state store keeps
//!   two sweeps of the same scope from racing each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::Instrument;

use surge_core::observability::sweep_span;
use surge_core::{AtomicStateStore, CounterKey, CouponId, ProductId, StampKey, SweepLockKey};

use crate::claim_store::ClaimStore;
use crate::coupon::{ClaimRecord, ClaimStatus};
use crate::error::{IssuanceError, Result};
use crate::metadata::CouponMetadataProvider;
use crate::metrics::IssuanceMetrics;

/// Retention of the advisory run lock; bounds how long a crashed run can
/// block its scope.
pub const SWEEP_LOCK_TTL: Duration = Duration::from_secs(15 * 60);

/// Which stamps a sweep run processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepSelector {
    /// Stamps whose recorded issuance time falls on the given UTC day,
    /// across all coupons. The scheduled trigger passes the previous day.
    Day(NaiveDate),
    /// Every remaining stamp for one coupon regardless of date. Used when
    /// an event closes.
    Coupon(CouponId),
}

impl SweepSelector {
    /// The key prefix this selector scans.
    #[must_use]
    pub fn scan_prefix(&self) -> String {
        match self {
            Self::Day(_) => StampKey::prefix_all().to_string(),
            Self::Coupon(coupon_id) => StampKey::prefix_coupon(*coupon_id),
        }
    }

    /// A stable scope string for locking and logging.
    #[must_use]
    pub fn scope(&self) -> String {
        match self {
            Self::Day(day) => format!("day:{day}"),
            Self::Coupon(coupon_id) => format!("coupon:{coupon_id}"),
        }
    }
}

impl std::fmt::Display for SweepSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.scope())
    }
}

/// One per-record failure inside a sweep run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepFailure {
    /// The stamp key that failed.
    pub key: String,
    /// Human-readable description of the failure.
    pub message: String,
}

/// Outcome summary of one sweep run.
///
/// The run as a whole never raises for per-record failures; this summary
/// is the observable result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepSummary {
    /// The swept scope (`day:…` or `coupon:…`).
    pub scope: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Stamp keys discovered under the scanned prefix.
    pub discovered: usize,
    /// New durable records created by the bulk insert.
    pub persisted: usize,
    /// Pairs skipped because a durable record already existed.
    pub skipped_existing: usize,
    /// Stamps outside the selected day window (day sweeps only).
    pub skipped_out_of_window: usize,
    /// Per-record failures (parse, lookup, unknown coupon).
    pub failed: usize,
    /// Details for each failure.
    pub failures: Vec<SweepFailure>,
}

impl SweepSummary {
    fn new(scope: String, started_at: DateTime<Utc>) -> Self {
        Self {
            scope,
            started_at,
            discovered: 0,
            persisted: 0,
            skipped_existing: 0,
            skipped_out_of_window: 0,
            failed: 0,
            failures: Vec::new(),
        }
    }

    /// Returns true if any per-record failures occurred.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    fn record_failure(&mut self, key: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(key, %message, "sweep record failed");
        self.failed += 1;
        self.failures.push(SweepFailure {
            key: key.to_string(),
            message,
        });
    }
}

/// The write-behind reconciliation job.
pub struct Reconciler {
    store: Arc<dyn AtomicStateStore>,
    claims: Arc<dyn ClaimStore>,
    metadata: Arc<dyn CouponMetadataProvider>,
    metrics: IssuanceMetrics,
}

impl Reconciler {
    /// Creates a reconciler over the given stores.
    #[must_use]
    pub fn new(
        store: Arc<dyn AtomicStateStore>,
        claims: Arc<dyn ClaimStore>,
        metadata: Arc<dyn CouponMetadataProvider>,
    ) -> Self {
        Self {
            store,
            claims,
            metadata,
            metrics: IssuanceMetrics::new(),
        }
    }

    /// Sweeps all stamps recorded on the given UTC day.
    ///
    /// # Errors
    ///
    /// Returns [`IssuanceError::SweepInProgress`] when another run holds
    /// the scope lock, or a store error when discovery or the bulk insert
    /// fails. Staging keys survive every error path.
    pub async fn sweep_day(&self, day: NaiveDate, now: DateTime<Utc>) -> Result<SweepSummary> {
        self.run_guarded(SweepSelector::Day(day), now).await
    }

    /// Sweeps every remaining stamp for a coupon and drops its counter
    /// staging key. Called when an event closes.
    ///
    /// The claim bitmap is deliberately left in place so late duplicate
    /// claims keep failing until it expires.
    ///
    /// # Errors
    ///
    /// Same contract as [`sweep_day`](Self::sweep_day).
    pub async fn close_event(
        &self,
        coupon_id: CouponId,
        now: DateTime<Utc>,
    ) -> Result<SweepSummary> {
        self.run_guarded(SweepSelector::Coupon(coupon_id), now).await
    }

    /// Runs a sweep under the scope's advisory lock.
    async fn run_guarded(
        &self,
        selector: SweepSelector,
        now: DateTime<Utc>,
    ) -> Result<SweepSummary> {
        let scope = selector.scope();
        let lock_key = SweepLockKey::scope(&scope);

        // First incrementer owns the run; the TTL bounds a crashed owner.
        let holders = self.store.increment(lock_key.as_ref()).await?;
        if holders > 1 {
            self.store.decrement(lock_key.as_ref()).await?;
            self.metrics.record_sweep_run(scope_kind(selector), "contended");
            return Err(IssuanceError::SweepInProgress { scope });
        }
        self.store.expire(lock_key.as_ref(), SWEEP_LOCK_TTL).await?;

        let result = self.run_sweep(selector, now).await;

        // Release regardless of outcome; a failed run retries next time.
        self.store.delete(&[lock_key.as_ref().to_string()]).await?;

        result
    }

    /// The sweep algorithm itself, lock-free and directly testable.
    ///
    /// # Errors
    ///
    /// Returns an error when discovery or the final bulk insert fails; in
    /// both cases no staging key has been deleted.
    pub async fn run_sweep(
        &self,
        selector: SweepSelector,
        now: DateTime<Utc>,
    ) -> Result<SweepSummary> {
        let span = sweep_span("run_sweep", &selector.scope());
        self.run_sweep_inner(selector, now).instrument(span).await
    }

    async fn run_sweep_inner(
        &self,
        selector: SweepSelector,
        now: DateTime<Utc>,
    ) -> Result<SweepSummary> {
        let started = Instant::now();

        let mut summary = SweepSummary::new(selector.scope(), now);
        let keys = self.store.scan_prefix(&selector.scan_prefix()).await?;
        summary.discovered = keys.len();

        let mut batch: Vec<ClaimRecord> = Vec::new();
        let mut processed_keys: Vec<String> = Vec::new();
        // One metadata lookup per coupon per run, not per stamp.
        let mut products: HashMap<CouponId, Option<ProductId>> = HashMap::new();

        for key in &keys {
            let (coupon_id, user_id) = match StampKey::parse(key) {
                Ok(pair) => pair,
                Err(err) => {
                    summary.record_failure(key, err.to_string());
                    continue;
                }
            };

            let stamp_millis = match self.store.get_value(key).await {
                Ok(value) => value,
                Err(err) => {
                    summary.record_failure(key, err.to_string());
                    continue;
                }
            };

            if let SweepSelector::Day(day) = selector {
                match stamp_millis.and_then(DateTime::from_timestamp_millis) {
                    Some(issued) if issued.date_naive() == day => {}
                    _ => {
                        // Outside the window (or undatable): leave the key
                        // for the run that owns its day, or for TTL expiry.
                        summary.skipped_out_of_window += 1;
                        continue;
                    }
                }
            }

            match self.claims.exists(coupon_id, user_id).await {
                Ok(true) => {
                    // Already reconciled by a prior run; the staging key
                    // can go.
                    summary.skipped_existing += 1;
                    processed_keys.push(key.clone());
                    continue;
                }
                Ok(false) => {}
                Err(err) => {
                    summary.record_failure(key, err.to_string());
                    continue;
                }
            }

            let issued_at = match stamp_millis.and_then(DateTime::from_timestamp_millis) {
                Some(issued) => issued,
                None => {
                    tracing::warn!(key = %key, "stamp value missing, falling back to sweep time");
                    now
                }
            };

            let product_id = match self.resolve_product(&mut products, coupon_id).await {
                Ok(Some(product_id)) => product_id,
                Ok(None) => {
                    summary.record_failure(key, format!("unknown coupon {coupon_id}"));
                    continue;
                }
                Err(err) => {
                    summary.record_failure(key, err.to_string());
                    continue;
                }
            };

            batch.push(ClaimRecord {
                coupon_id,
                user_id,
                product_id,
                issued_at,
                status: ClaimStatus::Issued,
            });
            processed_keys.push(key.clone());
        }

        if !batch.is_empty() {
            // The one failure that aborts a run: staging keys are kept so
            // the next run retries the same window.
            summary.persisted = self.claims.insert_batch(&batch).await?;
        }

        if !processed_keys.is_empty() {
            self.store.delete(&processed_keys).await?;
        }

        if let SweepSelector::Coupon(coupon_id) = selector {
            let counter_key = CounterKey::coupon(coupon_id);
            self.store
                .delete(&[counter_key.as_ref().to_string()])
                .await?;
        }

        self.metrics.record_sweep_outcome(&summary);
        self.metrics.record_sweep_run(scope_kind(selector), "completed");
        self.metrics
            .observe_sweep_duration(started.elapsed().as_secs_f64());

        tracing::info!(
            scope = %summary.scope,
            discovered = summary.discovered,
            persisted = summary.persisted,
            skipped_existing = summary.skipped_existing,
            skipped_out_of_window = summary.skipped_out_of_window,
            failed = summary.failed,
            "sweep completed"
        );

        Ok(summary)
    }

    async fn resolve_product(
        &self,
        products: &mut HashMap<CouponId, Option<ProductId>>,
        coupon_id: CouponId,
    ) -> Result<Option<ProductId>> {
        if let Some(cached) = products.get(&coupon_id) {
            return Ok(*cached);
        }
        let product_id = self
            .metadata
            .lookup(coupon_id)
            .await?
            .map(|quota| quota.product_id);
        products.insert(coupon_id, product_id);
        Ok(product_id)
    }
}

fn scope_kind(selector: SweepSelector) -> &'static str {
    match selector {
        SweepSelector::Day(_) => "day",
        SweepSelector::Coupon(_) => "coupon",
    }
}
