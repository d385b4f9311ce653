//! Coupon metadata and claim record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use surge_core::{CouponId, ProductId, UserId};

/// Lifecycle status of a coupon event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponStatus {
    /// The coupon event is open for claims.
    Active,
    /// The coupon event is closed; claims are rejected as not-found.
    Inactive,
}

impl CouponStatus {
    /// Returns true when the coupon is open for claims.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Coupon metadata as owned by the upstream catalog.
///
/// The admission core only reads and caches this. The maximum issuable
/// quantity is fixed once an event starts; the admission algorithm assumes
/// no mid-event increase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponQuota {
    /// The coupon id.
    pub coupon_id: CouponId,
    /// Display name of the coupon.
    pub name: String,
    /// Whether the coupon event is open.
    pub status: CouponStatus,
    /// Maximum number of units that may ever be admitted.
    pub max_quantity: u32,
    /// Units remaining according to the catalog at load time.
    ///
    /// Only consulted for the cache-fill short-circuit; the authoritative
    /// bound during the event is `max_quantity` against the admission
    /// counter.
    pub remain_quantity: u32,
    /// Discount applied by this coupon, in percent.
    pub discount_percent: u8,
    /// The product this coupon discounts.
    pub product_id: ProductId,
}

/// Status of a durable claim record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    /// The coupon was issued to the user and is spendable.
    Issued,
    /// The coupon was spent by the order flow.
    Used,
}

impl ClaimStatus {
    /// Returns true when the claim is still spendable.
    #[must_use]
    pub const fn is_issued(self) -> bool {
        matches!(self, Self::Issued)
    }
}

/// A durable claim record, the system of record for one admission.
///
/// At most one record exists per `(coupon_id, user_id)`; the ephemeral
/// bitmap and counter exist to protect exactly this invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    /// The claimed coupon.
    pub coupon_id: CouponId,
    /// The claiming user.
    pub user_id: UserId,
    /// The product the coupon discounts.
    pub product_id: ProductId,
    /// When the claim was admitted on the fast path.
    pub issued_at: DateTime<Utc>,
    /// Claim lifecycle status. The reconciler only ever writes `Issued`.
    pub status: ClaimStatus,
}

/// The success value returned to a caller confirming admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReceipt {
    /// The claiming user.
    pub user_id: UserId,
    /// The claimed coupon.
    pub coupon_id: CouponId,
    /// The product the coupon discounts.
    pub product_id: ProductId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_predicates() {
        assert!(CouponStatus::Active.is_active());
        assert!(!CouponStatus::Inactive.is_active());
        assert!(ClaimStatus::Issued.is_issued());
        assert!(!ClaimStatus::Used.is_issued());
    }

    #[test]
    fn receipt_serializes_camel_case() {
        let receipt = ClaimReceipt {
            user_id: UserId::new(1001),
            coupon_id: CouponId::new(7),
            product_id: ProductId::new(3),
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["userId"], 1001);
        assert_eq!(json["couponId"], 7);
        assert_eq!(json["productId"], 3);
    }

    #[test]
    fn claim_record_round_trip() {
        let record = ClaimRecord {
            coupon_id: CouponId::new(7),
            user_id: UserId::new(1001),
            product_id: ProductId::new(3),
            issued_at: Utc::now(),
            status: ClaimStatus::Issued,
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: ClaimRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
