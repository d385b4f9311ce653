//! Observability infrastructure for Surge.
//!
//! Structured logging with consistent spans. This module provides
//! initialization helpers and span constructors for consistent
//! observability across all Surge components.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `surge_issuance=debug`)
///
/// # Example
///
/// ```rust
/// use surge_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for claim-path operations with standard fields.
///
/// # Example
///
/// ```rust
/// use surge_core::observability::claim_span;
///
/// let span = claim_span("try_claim", 42, 1001);
/// let _guard = span.enter();
/// // ... arbitrate the claim
/// ```
#[must_use]
pub fn claim_span(operation: &str, coupon_id: u64, user_id: u64) -> Span {
    tracing::info_span!(
        "claim",
        op = operation,
        coupon_id = coupon_id,
        user_id = user_id,
    )
}

/// Creates a span for reconciliation sweep operations.
///
/// # Example
///
/// ```rust
/// use surge_core::observability::sweep_span;
///
/// let span = sweep_span("run_sweep", "day:2026-08-05");
/// let _guard = span.enter();
/// // ... run the sweep
/// ```
#[must_use]
pub fn sweep_span(operation: &str, scope: &str) -> Span {
    tracing::info_span!("sweep", op = operation, scope = scope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(LogFormat::Pretty);
        init_logging(LogFormat::Pretty); // Second call should be no-op
    }

    #[test]
    fn span_helpers_create_spans() {
        let span = claim_span("try_claim", 42, 1001);
        let _guard = span.enter();
        tracing::info!("claim message in span");

        let sweep = sweep_span("run_sweep", "coupon:42");
        let _sweep_guard = sweep.enter();
        tracing::info!("sweep message in span");
    }
}
