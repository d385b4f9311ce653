//! The public claim operation.
//!
//! [`IssuanceService`] is the entry point the API layer calls: it resolves
//! the coupon's quota through the cache, delegates arbitration to the
//! admission ledger, and converts the ledger's outcome into a receipt or a
//! typed rejection. No durable write happens on this path; durability is
//! deferred entirely to the reconciliation sweep so the hot path never
//! blocks on the system of record.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use surge_core::{AtomicStateStore, CouponId, ProductId, UserId};

use crate::coupon::ClaimReceipt;
use crate::error::{IssuanceError, Result};
use crate::ledger::{AdmissionLedger, ClaimOutcome};
use crate::metadata::CouponMetadataProvider;
use crate::metrics::IssuanceMetrics;
use crate::quota_cache::QuotaCache;

/// A claim attempt as submitted by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    /// The claiming user.
    pub user_id: UserId,
    /// The coupon to claim.
    pub coupon_id: CouponId,
    /// The product the coupon discounts.
    pub product_id: ProductId,
}

/// The public claim service.
pub struct IssuanceService {
    ledger: AdmissionLedger,
    quota: QuotaCache,
    metrics: IssuanceMetrics,
}

impl IssuanceService {
    /// Creates a service over the given store and metadata provider.
    #[must_use]
    pub fn new(
        store: Arc<dyn AtomicStateStore>,
        metadata: Arc<dyn CouponMetadataProvider>,
    ) -> Self {
        Self {
            ledger: AdmissionLedger::new(Arc::clone(&store)),
            quota: QuotaCache::new(store, metadata),
            metrics: IssuanceMetrics::new(),
        }
    }

    /// Creates a service from pre-built parts.
    #[must_use]
    pub fn from_parts(ledger: AdmissionLedger, quota: QuotaCache) -> Self {
        Self {
            ledger,
            quota,
            metrics: IssuanceMetrics::new(),
        }
    }

    /// Attempts to claim one unit of a coupon for a user.
    ///
    /// # Errors
    ///
    /// - [`IssuanceError::CouponNotFound`] when the coupon is unknown or inactive
    /// - [`IssuanceError::QuotaExhausted`] when no units are left
    /// - [`IssuanceError::AlreadyClaimed`] when the user already holds one
    ///
    /// Rejections are final from the core's perspective; retrying is the
    /// caller's decision and is always safe.
    pub async fn claim(&self, request: ClaimRequest) -> Result<ClaimReceipt> {
        let started = Instant::now();
        let result = self.claim_inner(request).await;

        let outcome_label = match &result {
            Ok(_) => "accepted",
            Err(IssuanceError::AlreadyClaimed { .. }) => "already_claimed",
            Err(IssuanceError::CouponNotFound { .. }) => "coupon_not_found",
            Err(IssuanceError::QuotaExhausted { .. }) => "quota_exhausted",
            Err(_) => "error",
        };
        self.metrics.record_claim(outcome_label);
        self.metrics
            .observe_claim_duration(started.elapsed().as_secs_f64());

        result
    }

    async fn claim_inner(&self, request: ClaimRequest) -> Result<ClaimReceipt> {
        let max_quantity = self.quota.get(request.coupon_id).await?;

        let outcome = self
            .ledger
            .try_claim(request.coupon_id, request.user_id, max_quantity, Utc::now())
            .await?;

        match outcome {
            ClaimOutcome::Accepted { .. } => Ok(ClaimReceipt {
                user_id: request.user_id,
                coupon_id: request.coupon_id,
                product_id: request.product_id,
            }),
            ClaimOutcome::AlreadyClaimed => Err(IssuanceError::AlreadyClaimed {
                coupon_id: request.coupon_id,
                user_id: request.user_id,
            }),
            ClaimOutcome::QuotaExhausted => Err(IssuanceError::QuotaExhausted {
                coupon_id: request.coupon_id,
                max_quantity,
            }),
        }
    }

    /// Returns the underlying ledger, e.g. for admission-state inspection.
    #[must_use]
    pub fn ledger(&self) -> &AdmissionLedger {
        &self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupon::{CouponQuota, CouponStatus};
    use crate::metadata::InMemoryCouponCatalog;
    use surge_core::MemoryStateStore;

    fn service_with(max: u32) -> IssuanceService {
        let store = Arc::new(MemoryStateStore::new());
        let catalog = Arc::new(InMemoryCouponCatalog::with_coupons(vec![CouponQuota {
            coupon_id: CouponId::new(7),
            name: "launch-day".into(),
            status: CouponStatus::Active,
            max_quantity: max,
            remain_quantity: max,
            discount_percent: 20,
            product_id: ProductId::new(3),
        }]));
        IssuanceService::new(store, catalog)
    }

    fn request(user_id: u64) -> ClaimRequest {
        ClaimRequest {
            user_id: UserId::new(user_id),
            coupon_id: CouponId::new(7),
            product_id: ProductId::new(3),
        }
    }

    #[tokio::test]
    async fn claim_returns_receipt() -> Result<()> {
        let service = service_with(10);

        let receipt = service.claim(request(1001)).await?;
        assert_eq!(receipt.user_id, UserId::new(1001));
        assert_eq!(receipt.coupon_id, CouponId::new(7));
        assert_eq!(receipt.product_id, ProductId::new(3));

        Ok(())
    }

    #[tokio::test]
    async fn second_claim_is_already_claimed() -> Result<()> {
        let service = service_with(10);

        service.claim(request(1001)).await?;
        let second = service.claim(request(1001)).await;
        assert!(matches!(
            second,
            Err(IssuanceError::AlreadyClaimed { .. })
        ));
        assert_eq!(service.ledger().admitted_count(CouponId::new(7)).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn exhausted_quota_is_rejected() -> Result<()> {
        let service = service_with(1);

        service.claim(request(1)).await?;
        let overflow = service.claim(request(2)).await;
        assert!(matches!(
            overflow,
            Err(IssuanceError::QuotaExhausted { max_quantity: 1, .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn unknown_coupon_is_rejected() {
        let service = service_with(10);

        let result = service
            .claim(ClaimRequest {
                user_id: UserId::new(1),
                coupon_id: CouponId::new(404),
                product_id: ProductId::new(3),
            })
            .await;
        assert!(matches!(result, Err(IssuanceError::CouponNotFound { .. })));
    }

    #[test]
    fn claim_request_deserializes_camel_case() {
        let request: ClaimRequest =
            serde_json::from_str(r#"{"userId":1001,"couponId":7,"productId":3}"#).unwrap();
        assert_eq!(request.user_id, UserId::new(1001));
        assert_eq!(request.coupon_id, CouponId::new(7));
        assert_eq!(request.product_id, ProductId::new(3));
    }
}
