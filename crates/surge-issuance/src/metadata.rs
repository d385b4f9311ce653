//! Coupon metadata lookup.
//!
//! The catalog that owns coupon definitions is an external collaborator;
//! the admission core reaches it only through [`CouponMetadataProvider`].
//! The quota cache in [`crate::quota_cache`] bounds how often the provider
//! is consulted.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use surge_core::{CouponId, Error as CoreError};

use crate::coupon::CouponQuota;
use crate::error::Result;

/// Read access to coupon metadata owned by the upstream catalog.
///
/// ## Thread Safety
///
/// All methods are `Send + Sync` to support concurrent access from the
/// claim path and the reconciliation sweep.
#[async_trait]
pub trait CouponMetadataProvider: Send + Sync {
    /// Looks up a coupon's metadata.
    ///
    /// Returns `None` when the coupon id is unknown. Callers decide how to
    /// treat inactive coupons; the provider reports status as-is.
    async fn lookup(&self, coupon_id: CouponId) -> Result<Option<CouponQuota>>;
}

/// In-memory coupon catalog for testing and local development.
///
/// ## Limitations
///
/// - **Single-process only**: State is not shared across process boundaries
#[derive(Debug, Default)]
pub struct InMemoryCouponCatalog {
    coupons: RwLock<HashMap<CouponId, CouponQuota>>,
}

/// Converts a lock poison error to a core store error.
fn poison_err<T>(_: PoisonError<T>) -> CoreError {
    CoreError::store("coupon catalog lock poisoned")
}

impl InMemoryCouponCatalog {
    /// Creates a new, empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates the catalog with coupons.
    #[must_use]
    pub fn with_coupons(coupons: impl IntoIterator<Item = CouponQuota>) -> Self {
        let coupons: HashMap<CouponId, CouponQuota> = coupons
            .into_iter()
            .map(|quota| (quota.coupon_id, quota))
            .collect();

        Self {
            coupons: RwLock::new(coupons),
        }
    }

    /// Inserts or replaces a coupon definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn insert(&self, quota: CouponQuota) -> Result<()> {
        let mut coupons = self.coupons.write().map_err(poison_err)?;
        coupons.insert(quota.coupon_id, quota);
        drop(coupons);
        Ok(())
    }
}

#[async_trait]
impl CouponMetadataProvider for InMemoryCouponCatalog {
    async fn lookup(&self, coupon_id: CouponId) -> Result<Option<CouponQuota>> {
        let coupons = self.coupons.read().map_err(poison_err)?;
        let quota = coupons.get(&coupon_id).cloned();
        drop(coupons);
        Ok(quota)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupon::CouponStatus;
    use surge_core::ProductId;

    fn quota(coupon_id: u64) -> CouponQuota {
        CouponQuota {
            coupon_id: CouponId::new(coupon_id),
            name: format!("coupon-{coupon_id}"),
            status: CouponStatus::Active,
            max_quantity: 100,
            remain_quantity: 100,
            discount_percent: 20,
            product_id: ProductId::new(1),
        }
    }

    #[tokio::test]
    async fn lookup_returns_known_coupon() -> Result<()> {
        let catalog = InMemoryCouponCatalog::with_coupons(vec![quota(7)]);

        let found = catalog.lookup(CouponId::new(7)).await?;
        assert_eq!(found.map(|q| q.max_quantity), Some(100));

        Ok(())
    }

    #[tokio::test]
    async fn lookup_returns_none_for_unknown() -> Result<()> {
        let catalog = InMemoryCouponCatalog::new();

        assert!(catalog.lookup(CouponId::new(404)).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn insert_replaces_existing() -> Result<()> {
        let catalog = InMemoryCouponCatalog::with_coupons(vec![quota(7)]);

        let mut updated = quota(7);
        updated.status = CouponStatus::Inactive;
        catalog.insert(updated)?;

        let found = catalog.lookup(CouponId::new(7)).await?;
        assert_eq!(found.map(|q| q.status), Some(CouponStatus::Inactive));

        Ok(())
    }
}
