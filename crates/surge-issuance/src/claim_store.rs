//! The durable claim store: the system of record for admissions.
//!
//! The store is an external collaborator (a relational table in the
//! original deployment). The core needs exactly two operations from it: a
//! per-pair existence check for idempotent reconciliation, and a bulk
//! insert for the write-behind batch. It is mutated only by the
//! reconciliation sweep, never by the claim path.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use surge_core::{CouponId, UserId};

use crate::coupon::ClaimRecord;
use crate::error::{IssuanceError, Result};

/// Durable storage for claim records.
///
/// ## Uniqueness
///
/// Implementations hold at most one record per `(coupon_id, user_id)`.
/// The sweep pre-checks existence, so [`insert_batch`](Self::insert_batch)
/// receives only novel pairs in normal operation; implementations must
/// still tolerate replays of the same pair without creating duplicates.
#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Returns whether a record exists for the pair.
    async fn exists(&self, coupon_id: CouponId, user_id: UserId) -> Result<bool>;

    /// Inserts a batch of records in one call, returning how many new
    /// records were created. Pairs that already exist are left untouched
    /// and not counted.
    ///
    /// The call is atomic from the sweep's perspective: on error, the
    /// sweep assumes nothing was persisted and retries the whole window
    /// on its next run.
    async fn insert_batch(&self, records: &[ClaimRecord]) -> Result<usize>;
}

/// In-memory claim store for testing and local development.
///
/// ## Limitations
///
/// - **Not durable**: All records are lost on drop
#[derive(Debug, Default)]
pub struct InMemoryClaimStore {
    records: RwLock<BTreeMap<(u64, u64), ClaimRecord>>,
}

/// Converts a lock poison error to a claim-store error.
fn poison_err<T>(_: PoisonError<T>) -> IssuanceError {
    IssuanceError::claim_store("claim store lock poisoned")
}

impl InMemoryClaimStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of records.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        let records = self.records.read().map_err(poison_err)?;
        Ok(records.len())
    }

    /// Returns whether the store holds no records.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns all records for a coupon, ordered by user id.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn records_for(&self, coupon_id: CouponId) -> Result<Vec<ClaimRecord>> {
        let records = self.records.read().map_err(poison_err)?;
        let matching = records
            .range((coupon_id.value(), u64::MIN)..=(coupon_id.value(), u64::MAX))
            .map(|(_, record)| record.clone())
            .collect();
        drop(records);
        Ok(matching)
    }
}

#[async_trait]
impl ClaimStore for InMemoryClaimStore {
    async fn exists(&self, coupon_id: CouponId, user_id: UserId) -> Result<bool> {
        let records = self.records.read().map_err(poison_err)?;
        let present = records.contains_key(&(coupon_id.value(), user_id.value()));
        drop(records);
        Ok(present)
    }

    async fn insert_batch(&self, batch: &[ClaimRecord]) -> Result<usize> {
        let mut records = self.records.write().map_err(poison_err)?;

        let mut inserted = 0;
        for record in batch {
            let key = (record.coupon_id.value(), record.user_id.value());
            if let std::collections::btree_map::Entry::Vacant(slot) = records.entry(key) {
                slot.insert(record.clone());
                inserted += 1;
            }
        }
        drop(records);
        Ok(inserted)
    }
}
