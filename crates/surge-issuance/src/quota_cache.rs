//! TTL-bounded cache of coupon maximum quantities.
//!
//! Every claim needs the coupon's maximum issuable quantity, but the
//! catalog must not be consulted once per claim. The cache stores the
//! maximum in the shared state store under [`QuotaKey`] with a bounded
//! TTL, so all service replicas share one fill and the catalog sees
//! roughly one lookup per coupon per TTL window regardless of claim
//! volume.

use std::sync::Arc;
use std::time::Duration;

use surge_core::{AtomicStateStore, CouponId, Error as CoreError, QuotaKey};

use crate::error::{IssuanceError, Result};
use crate::metadata::CouponMetadataProvider;
use crate::metrics::IssuanceMetrics;

/// Default retention of a cached maximum quantity.
pub const DEFAULT_QUOTA_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Store-backed cache of per-coupon maximum quantities.
pub struct QuotaCache {
    store: Arc<dyn AtomicStateStore>,
    metadata: Arc<dyn CouponMetadataProvider>,
    ttl: Duration,
    metrics: IssuanceMetrics,
}

impl QuotaCache {
    /// Creates a cache with the default 1-day TTL.
    #[must_use]
    pub fn new(
        store: Arc<dyn AtomicStateStore>,
        metadata: Arc<dyn CouponMetadataProvider>,
    ) -> Self {
        Self::with_ttl(store, metadata, DEFAULT_QUOTA_TTL)
    }

    /// Creates a cache with a custom TTL.
    #[must_use]
    pub fn with_ttl(
        store: Arc<dyn AtomicStateStore>,
        metadata: Arc<dyn CouponMetadataProvider>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            metadata,
            ttl,
            metrics: IssuanceMetrics::new(),
        }
    }

    /// Returns the maximum issuable quantity for a coupon.
    ///
    /// On cache miss the catalog is consulted once and the value cached
    /// with this cache's TTL.
    ///
    /// # Errors
    ///
    /// - [`IssuanceError::CouponNotFound`] when the coupon id is unknown or
    ///   the coupon is inactive
    /// - [`IssuanceError::QuotaExhausted`] when the catalog already reports
    ///   zero remaining units at fill time (short-circuit: the ledger is
    ///   never touched for a coupon known to be empty)
    pub async fn get(&self, coupon_id: CouponId) -> Result<u32> {
        let key = QuotaKey::coupon(coupon_id);

        if let Some(cached) = self.store.get_value(key.as_ref()).await? {
            let max = u32::try_from(cached).map_err(|_| {
                CoreError::internal(format!(
                    "cached quota for coupon {coupon_id} out of range: {cached}"
                ))
            })?;
            self.metrics.record_quota_fill("hit");
            return Ok(max);
        }

        let quota = self
            .metadata
            .lookup(coupon_id)
            .await?
            .filter(|quota| quota.status.is_active())
            .ok_or_else(|| {
                self.metrics.record_quota_fill("not_found");
                IssuanceError::CouponNotFound { coupon_id }
            })?;

        if quota.remain_quantity == 0 {
            self.metrics.record_quota_fill("exhausted_at_load");
            return Err(IssuanceError::QuotaExhausted {
                coupon_id,
                max_quantity: quota.max_quantity,
            });
        }

        self.store
            .set_value(key.as_ref(), i64::from(quota.max_quantity), Some(self.ttl))
            .await?;
        self.metrics.record_quota_fill("miss");

        tracing::debug!(
            coupon_id = coupon_id.value(),
            max_quantity = quota.max_quantity,
            "cached coupon quota"
        );

        Ok(quota.max_quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupon::{CouponQuota, CouponStatus};
    use crate::metadata::InMemoryCouponCatalog;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use surge_core::{MemoryStateStore, ProductId};

    fn quota(coupon_id: u64, max: u32, remain: u32, status: CouponStatus) -> CouponQuota {
        CouponQuota {
            coupon_id: CouponId::new(coupon_id),
            name: format!("coupon-{coupon_id}"),
            status,
            max_quantity: max,
            remain_quantity: remain,
            discount_percent: 10,
            product_id: ProductId::new(1),
        }
    }

    /// Counts catalog lookups to verify the cache bounds provider load.
    struct CountingCatalog {
        inner: InMemoryCouponCatalog,
        lookups: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl crate::metadata::CouponMetadataProvider for CountingCatalog {
        async fn lookup(&self, coupon_id: CouponId) -> Result<Option<CouponQuota>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.lookup(coupon_id).await
        }
    }

    #[tokio::test]
    async fn fills_once_per_ttl_window() -> Result<()> {
        let store = Arc::new(MemoryStateStore::new());
        let catalog = Arc::new(CountingCatalog {
            inner: InMemoryCouponCatalog::with_coupons(vec![quota(
                7,
                100,
                100,
                CouponStatus::Active,
            )]),
            lookups: AtomicUsize::new(0),
        });
        let cache = QuotaCache::new(store, Arc::clone(&catalog) as _);

        assert_eq!(cache.get(CouponId::new(7)).await?, 100);
        assert_eq!(cache.get(CouponId::new(7)).await?, 100);
        assert_eq!(cache.get(CouponId::new(7)).await?, 100);

        assert_eq!(catalog.lookups.load(Ordering::SeqCst), 1);

        Ok(())
    }

    #[tokio::test]
    async fn unknown_coupon_is_not_found() {
        let store = Arc::new(MemoryStateStore::new());
        let catalog = Arc::new(InMemoryCouponCatalog::new());
        let cache = QuotaCache::new(store, catalog);

        let result = cache.get(CouponId::new(404)).await;
        assert!(matches!(
            result,
            Err(IssuanceError::CouponNotFound { coupon_id }) if coupon_id == CouponId::new(404)
        ));
    }

    #[tokio::test]
    async fn inactive_coupon_is_not_found() {
        let store = Arc::new(MemoryStateStore::new());
        let catalog = Arc::new(InMemoryCouponCatalog::with_coupons(vec![quota(
            7,
            100,
            100,
            CouponStatus::Inactive,
        )]));
        let cache = QuotaCache::new(store, catalog);

        let result = cache.get(CouponId::new(7)).await;
        assert!(matches!(result, Err(IssuanceError::CouponNotFound { .. })));
    }

    #[tokio::test]
    async fn zero_remaining_short_circuits() {
        let store = Arc::new(MemoryStateStore::new());
        let catalog = Arc::new(InMemoryCouponCatalog::with_coupons(vec![quota(
            7,
            100,
            0,
            CouponStatus::Active,
        )]));
        let cache = QuotaCache::new(store, catalog);

        let result = cache.get(CouponId::new(7)).await;
        assert!(matches!(
            result,
            Err(IssuanceError::QuotaExhausted { max_quantity: 100, .. })
        ));
    }
}
