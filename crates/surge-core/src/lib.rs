//! # surge-core
//!
//! Core abstractions for the Surge coupon admission platform.
//!
//! This crate provides the foundational types and traits used across all
//! Surge components:
//!
//! - **Identifiers**: Strongly-typed numeric IDs for coupons, users, and products
//! - **State Keys**: Typed key builders for the shared ephemeral state store
//! - **Atomic Store**: The [`store::AtomicStateStore`] trait and its in-memory
//!   implementation
//! - **Error Types**: Shared error definitions and result types
//! - **Observability**: Logging initialization and span constructors
//!
//! ## Crate Boundary
//!
//! `surge-core` is the **only** crate allowed to define shared primitives.
//! The admission protocol and the reconciliation sweep both speak to the
//! outside world exclusively through the traits defined here.
//!
//! ## Example
//!
//! ```rust
//! use surge_core::prelude::*;
//!
//! let coupon = CouponId::new(42);
//! let key = CounterKey::coupon(coupon);
//! assert_eq!(key.as_ref(), "coupon:count:42");
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod id;
pub mod observability;
pub mod state_keys;
pub mod store;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use surge_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::id::{CouponId, ProductId, UserId};
    pub use crate::state_keys::{
        BitmapKey, CounterKey, QuotaKey, StampKey, StateKey, SweepLockKey,
    };
    pub use crate::store::{AtomicStateStore, MemoryStateStore};
}

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use id::{CouponId, ProductId, UserId};
pub use observability::{LogFormat, init_logging};
pub use state_keys::{BitmapKey, CounterKey, QuotaKey, StampKey, StateKey, SweepLockKey};
pub use store::{AtomicStateStore, MemoryStateStore};
