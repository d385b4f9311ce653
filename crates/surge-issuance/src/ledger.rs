//! The admission ledger: lock-free claim arbitration.
//!
//! The ledger arbitrates claims against a bounded quota using three pieces
//! of ephemeral state per coupon: a dedup bitmap, an admission counter, and
//! per-claim issuance stamps. The protocol composes individually-atomic
//! store primitives; it deliberately holds no coupon-level lock across
//! them, so contention is handled purely by the counter plus compensating
//! rollbacks.
//!
//! ## Protocol
//!
//! ```text
//! 1. read bitmap bit          set -> AlreadyClaimed (nothing mutated)
//! 2. increment counter -> n
//! 3. n > max                  -> decrement (rollback), QuotaExhausted
//! 4. test-and-set bitmap bit  prior set -> decrement (rollback), AlreadyClaimed
//! 5. write issuance stamp
//! 6. Accepted
//! ```
//!
//! Steps 2 and 4 are not one transaction, so each is individually
//! reversible: the counter never permanently counts an admission that did
//! not set a new bitmap bit. Counter-then-bitmap ordering makes the scarce
//! resource the first gate, so losing requests fail on the cheap quota
//! check rather than paying for a bitmap write.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::Instrument;

use surge_core::observability::claim_span;
use surge_core::{AtomicStateStore, BitmapKey, CounterKey, CouponId, StampKey, UserId};

use crate::error::Result;

/// Retention of the admission counter, applied when the counter is created.
pub const COUNTER_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Retention of the claim bitmap, refreshed on every successful claim.
///
/// Matches the stamp retention so the bitmap keeps rejecting re-claims for
/// as long as any unreconciled stamp can exist.
pub const BITMAP_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Retention of an issuance stamp; the reconciliation sweep must run at
/// least once within this window.
pub const STAMP_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Result of a claim arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The claim was admitted.
    Accepted {
        /// When the claim was admitted.
        issued_at: DateTime<Utc>,
    },
    /// The user already holds this coupon.
    AlreadyClaimed,
    /// The admission counter would exceed the maximum quantity.
    QuotaExhausted,
}

impl ClaimOutcome {
    /// Returns true if the claim was admitted.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Lock-free claim arbitration over the shared atomic store.
///
/// Cheap to clone; all state lives in the store.
#[derive(Clone)]
pub struct AdmissionLedger {
    store: Arc<dyn AtomicStateStore>,
}

impl std::fmt::Debug for AdmissionLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionLedger").finish_non_exhaustive()
    }
}

impl AdmissionLedger {
    /// Creates a ledger over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn AtomicStateStore>) -> Self {
        Self { store }
    }

    /// Arbitrates one claim attempt.
    ///
    /// Exactly `min(max_quantity, distinct attempting users)` concurrent
    /// attempts observe `Accepted`; which ones is unspecified. Retrying the
    /// same `(coupon_id, user_id)` after any outcome is idempotent.
    ///
    /// A `max_quantity` of zero short-circuits to `QuotaExhausted` before
    /// any state is touched.
    ///
    /// # Errors
    ///
    /// Returns an error only for store-level failures; business outcomes
    /// are values.
    pub async fn try_claim(
        &self,
        coupon_id: CouponId,
        user_id: UserId,
        max_quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        let span = claim_span("try_claim", coupon_id.value(), user_id.value());
        self.try_claim_inner(coupon_id, user_id, max_quantity, now)
            .instrument(span)
            .await
    }

    async fn try_claim_inner(
        &self,
        coupon_id: CouponId,
        user_id: UserId,
        max_quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        if max_quantity == 0 {
            return Ok(ClaimOutcome::QuotaExhausted);
        }

        let bitmap_key = BitmapKey::coupon(coupon_id);
        let counter_key = CounterKey::coupon(coupon_id);

        // Step 1: dedup pre-check. Repeat claimers fail here without
        // touching the counter.
        if self.store.get_bit(bitmap_key.as_ref(), user_id.value()).await? {
            return Ok(ClaimOutcome::AlreadyClaimed);
        }

        // Step 2: admission increment.
        let admitted = self.store.increment(counter_key.as_ref()).await?;
        if admitted == 1 {
            self.store
                .expire(counter_key.as_ref(), COUNTER_TTL)
                .await?;
        }

        // Step 3: quota check with compensating rollback.
        if admitted > i64::from(max_quantity) {
            self.store.decrement(counter_key.as_ref()).await?;
            return Ok(ClaimOutcome::QuotaExhausted);
        }

        // Step 4: claim commit. A prior bit means a concurrent request for
        // the same user won the race between steps 1 and 4; this admission
        // yielded no new distinct claim, so roll the counter back.
        if self.store.set_bit(bitmap_key.as_ref(), user_id.value()).await? {
            self.store.decrement(counter_key.as_ref()).await?;
            return Ok(ClaimOutcome::AlreadyClaimed);
        }
        self.store.expire(bitmap_key.as_ref(), BITMAP_TTL).await?;

        // Step 5: issuance stamp for the reconciliation sweep.
        let stamp_key = StampKey::claim(coupon_id, user_id);
        self.store
            .set_value(stamp_key.as_ref(), now.timestamp_millis(), Some(STAMP_TTL))
            .await?;

        tracing::debug!(admitted, "claim accepted");

        Ok(ClaimOutcome::Accepted { issued_at: now })
    }

    /// Returns the current admission counter value for a coupon.
    ///
    /// After contention settles this equals the number of set bitmap bits.
    pub async fn admitted_count(&self, coupon_id: CouponId) -> Result<i64> {
        let key = CounterKey::coupon(coupon_id);
        Ok(self.store.get_value(key.as_ref()).await?.unwrap_or(0))
    }

    /// Returns whether a user holds a claim bit for a coupon.
    pub async fn has_claimed(&self, coupon_id: CouponId, user_id: UserId) -> Result<bool> {
        let key = BitmapKey::coupon(coupon_id);
        Ok(self.store.get_bit(key.as_ref(), user_id.value()).await?)
    }
}
