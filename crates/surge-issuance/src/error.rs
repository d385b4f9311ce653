//! Error types for the issuance domain.

use surge_core::{CouponId, UserId};

/// The result type used throughout surge-issuance.
pub type Result<T> = std::result::Result<T, IssuanceError>;

/// Errors that can occur in claim arbitration and reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    /// The user already holds this coupon.
    #[error("user {user_id} already claimed coupon {coupon_id}")]
    AlreadyClaimed {
        /// The coupon that was claimed.
        coupon_id: CouponId,
        /// The user holding the existing claim.
        user_id: UserId,
    },

    /// The coupon id is unknown or the coupon is inactive.
    #[error("coupon not found: {coupon_id}")]
    CouponNotFound {
        /// The coupon id that was looked up.
        coupon_id: CouponId,
    },

    /// The admission counter would exceed the coupon's maximum quantity.
    #[error("coupon {coupon_id} quota of {max_quantity} exhausted")]
    QuotaExhausted {
        /// The coupon whose quota ran out.
        coupon_id: CouponId,
        /// The maximum issuable quantity.
        max_quantity: u32,
    },

    /// A sweep for the same scope is already running.
    #[error("sweep already in progress for scope '{scope}'")]
    SweepInProgress {
        /// The scope (date or coupon) of the contended sweep.
        scope: String,
    },

    /// A durable claim-store operation failed.
    #[error("claim store error: {message}")]
    ClaimStore {
        /// Description of the claim-store failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An error from the shared state store.
    #[error("core error: {0}")]
    Core(#[from] surge_core::Error),
}

impl IssuanceError {
    /// Creates a new claim-store error.
    #[must_use]
    pub fn claim_store(message: impl Into<String>) -> Self {
        Self::ClaimStore {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new claim-store error with a source cause.
    #[must_use]
    pub fn claim_store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ClaimStore {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true for the claim-path rejections a caller can receive:
    /// already claimed, coupon not found, quota exhausted.
    #[must_use]
    pub fn is_claim_rejection(&self) -> bool {
        matches!(
            self,
            Self::AlreadyClaimed { .. } | Self::CouponNotFound { .. } | Self::QuotaExhausted { .. }
        )
    }
}
