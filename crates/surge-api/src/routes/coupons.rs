//! Coupon claim and event-close routes.
//!
//! ## Routes
//!
//! - `POST /coupons/issue` - Claim one unit of a coupon for a user
//! - `POST /coupons/{coupon_id}/close` - Close an event and sweep its
//!   remaining staged claims into the durable store
//!
//! Claim rejections (already claimed, coupon not found, quota exhausted)
//! all surface as 404 with the specific reason as the error code.

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;

use surge_core::CouponId;
use surge_issuance::coupon::ClaimReceipt;
use surge_issuance::reconcile::SweepSummary;
use surge_issuance::service::ClaimRequest;

use crate::error::ApiResult;
use crate::server::AppState;

/// Builds the coupon routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/coupons/issue", post(issue_coupon))
        .route("/coupons/{coupon_id}/close", post(close_coupon))
}

/// `POST /coupons/issue` - first-come-first-served coupon claim.
async fn issue_coupon(
    State(state): State<AppState>,
    Json(request): Json<ClaimRequest>,
) -> ApiResult<Json<ClaimReceipt>> {
    let receipt = state.issuance.claim(request).await?;
    Ok(Json(receipt))
}

/// `POST /coupons/{coupon_id}/close` - administrative event close.
///
/// Triggers an immediate full sweep for the coupon; the response is the
/// sweep's summary.
async fn close_coupon(
    State(state): State<AppState>,
    Path(coupon_id): Path<u64>,
) -> ApiResult<Json<SweepSummary>> {
    let summary = state
        .reconciler
        .close_event(CouponId::new(coupon_id), Utc::now())
        .await?;
    Ok(Json(summary))
}
