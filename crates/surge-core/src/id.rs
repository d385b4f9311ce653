//! Strongly-typed identifiers for Surge entities.
//!
//! All identifiers in Surge are:
//! - **Strongly typed**: Prevents mixing up different ID types at compile time
//! - **Numeric**: Coupon, user, and product ids are `u64` values assigned by
//!   the upstream catalog; user ids double as bit offsets in the claim bitmap
//!
//! # Example
//!
//! ```rust
//! use surge_core::id::{CouponId, UserId};
//!
//! let coupon = CouponId::new(42);
//! let user = UserId::new(1001);
//!
//! // IDs are different types - this won't compile:
//! // let wrong: CouponId = user;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

macro_rules! numeric_id {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates an ID from its raw numeric value.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw numeric value.
            #[must_use]
            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                s.parse::<u64>().map(Self).map_err(|e| {
                    Error::InvalidInput(format!(concat!("invalid ", $label, " id '{}': {}"), s, e))
                })
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// A unique identifier for a coupon.
    ///
    /// All ephemeral admission state (counter, bitmap, issuance stamps) is
    /// keyed per coupon; concurrent claims for different coupons never
    /// interact.
    CouponId,
    "coupon"
);

numeric_id!(
    /// A unique identifier for a user.
    ///
    /// The user id is also the bit offset of that user's claim bit in the
    /// per-coupon claim bitmap.
    UserId,
    "user"
);

numeric_id!(
    /// A unique identifier for a product.
    ///
    /// Each coupon discounts exactly one product; the product id is carried
    /// into the durable claim record at reconciliation time.
    ProductId,
    "product"
);
