//! HTTP-level tests for the claim and reconcile routes.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use surge_core::{AtomicStateStore, CouponId, MemoryStateStore, ProductId};
use surge_issuance::claim_store::{ClaimStore, InMemoryClaimStore};
use surge_issuance::coupon::{CouponQuota, CouponStatus};
use surge_issuance::metadata::{CouponMetadataProvider, InMemoryCouponCatalog};
use surge_issuance::reconcile::Reconciler;
use surge_issuance::service::IssuanceService;

use surge_api::server::{AppState, router};

fn app(max_quantity: u32) -> Router {
    let store: Arc<dyn AtomicStateStore> = Arc::new(MemoryStateStore::new());
    let claims: Arc<dyn ClaimStore> = Arc::new(InMemoryClaimStore::new());
    let catalog: Arc<dyn CouponMetadataProvider> =
        Arc::new(InMemoryCouponCatalog::with_coupons(vec![CouponQuota {
            coupon_id: CouponId::new(7),
            name: "launch-day".into(),
            status: CouponStatus::Active,
            max_quantity,
            remain_quantity: max_quantity,
            discount_percent: 20,
            product_id: ProductId::new(3),
        }]));

    let issuance = Arc::new(IssuanceService::new(
        Arc::clone(&store),
        Arc::clone(&catalog),
    ));
    let reconciler = Arc::new(Reconciler::new(store, claims, catalog));

    router(AppState::new(issuance, reconciler))
}

fn claim_request(user_id: u64, coupon_id: u64) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/coupons/issue")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"userId": user_id, "couponId": coupon_id, "productId": 3}).to_string(),
        ))
        .expect("request builds")
}

async fn body_json(body: Body) -> Value {
    let bytes = to_bytes(body, usize::MAX).await.expect("body reads");
    serde_json::from_slice(&bytes).expect("body is JSON")
}

#[tokio::test]
async fn health_returns_ok() {
    let app = app(10);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request handled");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn issue_returns_receipt() {
    let app = app(10);

    let response = app
        .oneshot(claim_request(1001, 7))
        .await
        .expect("request handled");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.into_body()).await;
    assert_eq!(body["userId"], 1001);
    assert_eq!(body["couponId"], 7);
    assert_eq!(body["productId"], 3);
}

#[tokio::test]
async fn duplicate_claim_is_not_found_with_reason() {
    let app = app(10);

    let first = app
        .clone()
        .oneshot(claim_request(1001, 7))
        .await
        .expect("request handled");
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(claim_request(1001, 7))
        .await
        .expect("request handled");
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
    let body = body_json(second.into_body()).await;
    assert_eq!(body["code"], "ALREADY_CLAIMED");
}

#[tokio::test]
async fn exhausted_quota_is_not_found_with_reason() {
    let app = app(1);

    let winner = app
        .clone()
        .oneshot(claim_request(1, 7))
        .await
        .expect("request handled");
    assert_eq!(winner.status(), StatusCode::OK);

    let loser = app
        .oneshot(claim_request(2, 7))
        .await
        .expect("request handled");
    assert_eq!(loser.status(), StatusCode::NOT_FOUND);
    let body = body_json(loser.into_body()).await;
    assert_eq!(body["code"], "QUOTA_EXHAUSTED");
}

#[tokio::test]
async fn unknown_coupon_is_not_found_with_reason() {
    let app = app(10);

    let response = app
        .oneshot(claim_request(1, 404))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response.into_body()).await;
    assert_eq!(body["code"], "COUPON_NOT_FOUND");
}

#[tokio::test]
async fn event_close_returns_sweep_summary() {
    let app = app(10);

    for user_id in 1..=3 {
        let response = app
            .clone()
            .oneshot(claim_request(user_id, 7))
            .await
            .expect("request handled");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/coupons/7/close")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request handled");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.into_body()).await;
    assert_eq!(body["scope"], "coupon:7");
    assert_eq!(body["discovered"], 3);
    assert_eq!(body["persisted"], 3);
    assert_eq!(body["failed"], 0);
}

#[tokio::test]
async fn reconcile_run_sweeps_previous_day() {
    let app = app(10);

    // Claims land today, so yesterday's window is empty; the trigger
    // still succeeds and reports an empty summary.
    let claim = app
        .clone()
        .oneshot(claim_request(1, 7))
        .await
        .expect("request handled");
    assert_eq!(claim.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/internal/reconcile/run")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request handled");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.into_body()).await;
    assert_eq!(body["persisted"], 0);
    assert_eq!(body["skippedOutOfWindow"], 1);
}
