//! # surge-issuance
//!
//! Coupon admission and write-behind reconciliation for the Surge
//! flash-sale platform.
//!
//! This crate implements the issuance domain, providing:
//!
//! - **Claim Arbitration**: Lock-free admission against a bounded quota
//! - **Per-User Dedup**: At most one claim per `(coupon, user)`, enforced
//!   by an atomic test-and-set bitmap
//! - **Write-Behind Durability**: Accepted claims are staged in the state
//!   store and promoted to the durable system of record by an idempotent
//!   sweep
//!
//! ## Core Concepts
//!
//! - **Admission**: Being granted one of a limited number of coupon units;
//!   arbitrated by [`ledger::AdmissionLedger`]
//! - **Ephemeral state**: Bounded-TTL staging data (counter, bitmap,
//!   issuance stamps) that exists only until reconciled
//! - **Reconciliation sweep**: [`reconcile::Reconciler`] promoting staged
//!   claims into [`claim_store::ClaimStore`], on a daily schedule or when
//!   an event closes
//!
//! ## Guarantees
//!
//! - **Quota bound**: Never more than `max_quantity` accepted claims per
//!   coupon, no matter the fan-in
//! - **Uniqueness**: At most one durable claim record per `(coupon, user)`
//! - **No hot-path durable writes**: The claim path touches only the
//!   atomic state store; the system of record is written by the sweep
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use surge_core::{CouponId, MemoryStateStore, ProductId, UserId};
//! use surge_issuance::coupon::{CouponQuota, CouponStatus};
//! use surge_issuance::error::Result;
//! use surge_issuance::metadata::InMemoryCouponCatalog;
//! use surge_issuance::service::{ClaimRequest, IssuanceService};
//!
//! # async fn claim() -> Result<()> {
//! let store = Arc::new(MemoryStateStore::new());
//! let catalog = Arc::new(InMemoryCouponCatalog::with_coupons(vec![CouponQuota {
//!     coupon_id: CouponId::new(7),
//!     name: "launch-day".into(),
//!     status: CouponStatus::Active,
//!     max_quantity: 100,
//!     remain_quantity: 100,
//!     discount_percent: 20,
//!     product_id: ProductId::new(3),
//! }]));
//!
//! let service = IssuanceService::new(store, catalog);
//! let receipt = service
//!     .claim(ClaimRequest {
//!         user_id: UserId::new(1001),
//!         coupon_id: CouponId::new(7),
//!         product_id: ProductId::new(3),
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod claim_store;
pub mod coupon;
pub mod error;
pub mod ledger;
pub mod metadata;
pub mod metrics;
pub mod quota_cache;
pub mod reconcile;
pub mod schedule;
pub mod service;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::claim_store::{ClaimStore, InMemoryClaimStore};
    pub use crate::coupon::{ClaimReceipt, ClaimRecord, ClaimStatus, CouponQuota, CouponStatus};
    pub use crate::error::{IssuanceError, Result};
    pub use crate::ledger::{AdmissionLedger, ClaimOutcome};
    pub use crate::metadata::{CouponMetadataProvider, InMemoryCouponCatalog};
    pub use crate::metrics::IssuanceMetrics;
    pub use crate::quota_cache::QuotaCache;
    pub use crate::reconcile::{Reconciler, SweepSelector, SweepSummary};
    pub use crate::schedule::SweepSchedule;
    pub use crate::service::{ClaimRequest, IssuanceService};
}
