//! # surge-api
//!
//! HTTP surface for the Surge coupon admission platform.
//!
//! The API is deliberately thin: request shaping, error mapping, and
//! trigger wiring. All admission and reconciliation logic lives in
//! `surge-issuance`.
//!
//! ## Routes
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | `/health` | GET | Liveness probe |
//! | `/coupons/issue` | POST | Claim one unit of a coupon |
//! | `/coupons/{coupon_id}/close` | POST | Close an event, sweep its remainder |
//! | `/internal/reconcile/run` | POST | Sweep the previous day on demand |

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod routes;
pub mod server;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use server::{AppState, router};
