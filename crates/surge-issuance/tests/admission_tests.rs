//! Integration tests for claim arbitration under contention.

use std::sync::Arc;

use surge_core::{CouponId, MemoryStateStore, ProductId, UserId};
use surge_issuance::coupon::{CouponQuota, CouponStatus};
use surge_issuance::error::{IssuanceError, Result};
use surge_issuance::metadata::InMemoryCouponCatalog;
use surge_issuance::service::{ClaimRequest, IssuanceService};

const COUPON: CouponId = CouponId::new(7);
const PRODUCT: ProductId = ProductId::new(3);

fn coupon(max_quantity: u32) -> CouponQuota {
    CouponQuota {
        coupon_id: COUPON,
        name: "launch-day".into(),
        status: CouponStatus::Active,
        max_quantity,
        remain_quantity: max_quantity,
        discount_percent: 20,
        product_id: PRODUCT,
    }
}

fn service(max_quantity: u32) -> Arc<IssuanceService> {
    let store = Arc::new(MemoryStateStore::new());
    let catalog = Arc::new(InMemoryCouponCatalog::with_coupons(vec![coupon(
        max_quantity,
    )]));
    Arc::new(IssuanceService::new(store, catalog))
}

fn request(user_id: u64) -> ClaimRequest {
    ClaimRequest {
        user_id: UserId::new(user_id),
        coupon_id: COUPON,
        product_id: PRODUCT,
    }
}

/// Fires one claim per user concurrently and returns the outcomes.
async fn fire_claims(
    service: &Arc<IssuanceService>,
    user_ids: impl IntoIterator<Item = u64>,
) -> Vec<Result<()>> {
    let mut handles = Vec::new();
    for user_id in user_ids {
        let service = Arc::clone(service);
        handles.push(tokio::spawn(async move {
            service.claim(request(user_id)).await.map(|_| ())
        }));
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.expect("claim task panicked"));
    }
    outcomes
}

#[tokio::test]
async fn quota_one_with_hundred_contenders_admits_exactly_one() -> Result<()> {
    let service = service(1);

    let outcomes = fire_claims(&service, 1..=100).await;

    let accepted = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(accepted, 1);

    for outcome in &outcomes {
        if let Err(err) = outcome {
            assert!(
                matches!(
                    err,
                    IssuanceError::QuotaExhausted { .. } | IssuanceError::AlreadyClaimed { .. }
                ),
                "unexpected rejection: {err}"
            );
        }
    }

    // Counter integrity: rollbacks leave no permanent overcount.
    assert_eq!(service.ledger().admitted_count(COUPON).await?, 1);

    Ok(())
}

#[tokio::test]
async fn quota_bound_holds_for_larger_quotas() -> Result<()> {
    let service = service(10);

    let outcomes = fire_claims(&service, 1..=100).await;

    let accepted = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(accepted, 10);
    assert_eq!(service.ledger().admitted_count(COUPON).await?, 10);

    // Exactly the winners hold bitmap bits.
    let mut bits = 0;
    for user_id in 1..=100 {
        if service.ledger().has_claimed(COUPON, UserId::new(user_id)).await? {
            bits += 1;
        }
    }
    assert_eq!(bits, 10);

    Ok(())
}

#[tokio::test]
async fn quota_bound_is_distinct_users_when_fewer_than_quota() -> Result<()> {
    let service = service(50);

    let outcomes = fire_claims(&service, 1..=5).await;

    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 5);
    assert_eq!(service.ledger().admitted_count(COUPON).await?, 5);

    Ok(())
}

#[tokio::test]
async fn sequential_duplicate_claim_is_rejected_without_counter_change() -> Result<()> {
    let service = service(10);

    service.claim(request(1001)).await?;
    let counter_after_first = service.ledger().admitted_count(COUPON).await?;

    let second = service.claim(request(1001)).await;
    assert!(matches!(
        second,
        Err(IssuanceError::AlreadyClaimed { user_id, .. }) if user_id == UserId::new(1001)
    ));
    assert_eq!(
        service.ledger().admitted_count(COUPON).await?,
        counter_after_first
    );

    Ok(())
}

#[tokio::test]
async fn same_user_racing_itself_is_admitted_once() -> Result<()> {
    let service = service(10);

    let outcomes = fire_claims(&service, std::iter::repeat_n(1001_u64, 50)).await;

    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    assert_eq!(service.ledger().admitted_count(COUPON).await?, 1);

    Ok(())
}

#[tokio::test]
async fn rejected_users_can_never_sneak_in_later() -> Result<()> {
    let service = service(1);

    let outcomes = fire_claims(&service, 1..=20).await;
    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);

    // Quota is gone; every retry stays rejected.
    for user_id in 1..=20 {
        let retry = service.claim(request(user_id)).await;
        assert!(retry.is_err());
    }
    assert_eq!(service.ledger().admitted_count(COUPON).await?, 1);

    Ok(())
}

#[tokio::test]
async fn inactive_coupon_is_not_found() {
    let store = Arc::new(MemoryStateStore::new());
    let mut inactive = coupon(10);
    inactive.status = CouponStatus::Inactive;
    let catalog = Arc::new(InMemoryCouponCatalog::with_coupons(vec![inactive]));
    let service = IssuanceService::new(store, catalog);

    let result = service.claim(request(1)).await;
    assert!(matches!(result, Err(IssuanceError::CouponNotFound { .. })));
}

#[tokio::test]
async fn coupons_are_fully_independent() -> Result<()> {
    let store = Arc::new(MemoryStateStore::new());
    let mut other = coupon(1);
    other.coupon_id = CouponId::new(8);
    let catalog = Arc::new(InMemoryCouponCatalog::with_coupons(vec![coupon(1), other]));
    let service = IssuanceService::new(store, catalog);

    // Same user can win both coupons; exhausting one leaves the other open.
    service.claim(request(1)).await?;
    service
        .claim(ClaimRequest {
            user_id: UserId::new(1),
            coupon_id: CouponId::new(8),
            product_id: PRODUCT,
        })
        .await?;

    assert_eq!(service.ledger().admitted_count(COUPON).await?, 1);
    assert_eq!(
        service.ledger().admitted_count(CouponId::new(8)).await?,
        1
    );

    Ok(())
}
