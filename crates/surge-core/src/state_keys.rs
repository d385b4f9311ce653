//! Typed state-store keys for compile-time key safety.
//!
//! This module provides strongly-typed keys that encode the ephemeral-store
//! key structure at the type level. Each key type corresponds to a specific
//! key prefix with specific ownership semantics.
//!
//! # Design Philosophy
//!
//! - **Type safety**: Malformed keys cannot be constructed at compile time
//! - **Ownership encoding**: Key types encode which component writes what
//! - **No stringly-typed keys**: Use `CounterKey`, `StampKey`, etc. instead of `&str`
//!
//! # Key Types
//!
//! | Key Type | Pattern | Who Writes | Who Deletes |
//! |----------|---------|------------|-------------|
//! | `CounterKey` | `coupon:count:{coupon}` | Ledger | Reconciler (event close) |
//! | `BitmapKey` | `coupon:bitmap:{coupon}` | Ledger | Nobody (TTL only) |
//! | `StampKey` | `coupon:timestamp:{coupon}:{user}` | Ledger | Reconciler |
//! | `QuotaKey` | `coupon:max:{coupon}` | Quota cache | Nobody (TTL only) |
//! | `SweepLockKey` | `coupon:sweeplock:{scope}` | Reconciler | Reconciler |
//!
//! # Example
//!
//! ```rust
//! use surge_core::state_keys::{CounterKey, StampKey};
//! use surge_core::id::{CouponId, UserId};
//!
//! let counter = CounterKey::coupon(CouponId::new(7));
//! assert_eq!(counter.as_ref(), "coupon:count:7");
//!
//! let stamp = StampKey::claim(CouponId::new(7), UserId::new(1001));
//! let (coupon, user) = StampKey::parse(stamp.as_ref()).unwrap();
//! assert_eq!(coupon, CouponId::new(7));
//! assert_eq!(user, UserId::new(1001));
//! ```

use crate::error::{Error, Result};
use crate::id::{CouponId, UserId};

const COUNTER_PREFIX: &str = "coupon:count:";
const BITMAP_PREFIX: &str = "coupon:bitmap:";
const STAMP_PREFIX: &str = "coupon:timestamp:";
const QUOTA_PREFIX: &str = "coupon:max:";
const SWEEP_LOCK_PREFIX: &str = "coupon:sweeplock:";

/// A typed state-store key.
///
/// All key types implement this trait to provide uniform access to the
/// underlying key string.
pub trait StateKey: AsRef<str> {
    /// Returns the underlying key string.
    fn key(&self) -> &str {
        self.as_ref()
    }
}

macro_rules! impl_key_traits {
    ($name:ident) => {
        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl StateKey for $name {}

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ============================================================================
// CounterKey - admission counter, one per coupon
// ============================================================================

/// A typed key for the per-coupon admission counter.
///
/// The counter value is the number of admissions granted so far; it is
/// incremented on every attempt and decremented by compensating rollbacks,
/// so after contention settles it equals the number of set bitmap bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey(String);

impl CounterKey {
    /// Creates the counter key for a coupon.
    #[must_use]
    pub fn coupon(coupon_id: CouponId) -> Self {
        Self(format!("{COUNTER_PREFIX}{coupon_id}"))
    }
}

impl_key_traits!(CounterKey);

// ============================================================================
// BitmapKey - per-user dedup bits, one bitmap per coupon
// ============================================================================

/// A typed key for the per-coupon claim bitmap.
///
/// Bit offset = user id. A set bit is never cleared for the lifetime of the
/// event; the reconciler leaves the bitmap untouched so re-claims keep
/// failing after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitmapKey(String);

impl BitmapKey {
    /// Creates the bitmap key for a coupon.
    #[must_use]
    pub fn coupon(coupon_id: CouponId) -> Self {
        Self(format!("{BITMAP_PREFIX}{coupon_id}"))
    }
}

impl_key_traits!(BitmapKey);

// ============================================================================
// StampKey - issuance timestamps, one per successful claim
// ============================================================================

/// A typed key for a claim's issuance-timestamp entry.
///
/// The stored value is the issuance time in epoch milliseconds. These are
/// the staging records the reconciliation sweep discovers, promotes to
/// durable claim records, and deletes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StampKey(String);

impl StampKey {
    /// Creates the stamp key for a specific claim.
    #[must_use]
    pub fn claim(coupon_id: CouponId, user_id: UserId) -> Self {
        Self(format!("{STAMP_PREFIX}{coupon_id}:{user_id}"))
    }

    /// Returns the prefix matching every stamp key regardless of coupon.
    #[must_use]
    pub fn prefix_all() -> &'static str {
        STAMP_PREFIX
    }

    /// Returns the prefix matching every stamp key for one coupon.
    #[must_use]
    pub fn prefix_coupon(coupon_id: CouponId) -> String {
        format!("{STAMP_PREFIX}{coupon_id}:")
    }

    /// Parses a stamp key back into its `(coupon, user)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the key does not match the
    /// `coupon:timestamp:{coupon}:{user}` pattern.
    pub fn parse(key: &str) -> Result<(CouponId, UserId)> {
        let rest = key
            .strip_prefix(STAMP_PREFIX)
            .ok_or_else(|| Error::invalid_key(key, "missing stamp prefix"))?;

        let (coupon, user) = rest
            .split_once(':')
            .ok_or_else(|| Error::invalid_key(key, "missing user id segment"))?;

        let coupon_id = coupon
            .parse::<u64>()
            .map_err(|_| Error::invalid_key(key, "non-numeric coupon id"))?;
        let user_id = user
            .parse::<u64>()
            .map_err(|_| Error::invalid_key(key, "non-numeric user id"))?;

        Ok((CouponId::new(coupon_id), UserId::new(user_id)))
    }
}

impl_key_traits!(StampKey);

// ============================================================================
// QuotaKey - cached max quantity, one per coupon
// ============================================================================

/// A typed key for the cached maximum issuable quantity of a coupon.
///
/// Written by the quota cache with a bounded TTL so the metadata provider
/// sees roughly one lookup per coupon per TTL window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuotaKey(String);

impl QuotaKey {
    /// Creates the quota key for a coupon.
    #[must_use]
    pub fn coupon(coupon_id: CouponId) -> Self {
        Self(format!("{QUOTA_PREFIX}{coupon_id}"))
    }
}

impl_key_traits!(QuotaKey);

// ============================================================================
// SweepLockKey - advisory single-instance guard for sweep runs
// ============================================================================

/// A typed key for the reconciler's advisory run lock.
///
/// The lock is an increment-with-TTL: the run whose increment returns 1
/// owns the sweep for that scope until it deletes the key or the TTL
/// expires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SweepLockKey(String);

impl SweepLockKey {
    /// Creates the run-lock key for a sweep scope (a date or a coupon id).
    #[must_use]
    pub fn scope(scope: &str) -> Self {
        Self(format!("{SWEEP_LOCK_PREFIX}{scope}"))
    }
}

impl_key_traits!(SweepLockKey);
