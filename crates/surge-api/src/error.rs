//! API error types and HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use surge_issuance::error::IssuanceError;

/// API result type.
pub type ApiResult<T> = Result<T, ApiError>;

/// Standard JSON error response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message (safe for clients).
    pub message: String,
}

/// HTTP API error with stable machine-readable code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Returns an error response for invalid input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Returns an error response for missing resources.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Returns an error response for conflicting operations.
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    /// Returns an internal error response.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
    }

    /// Returns a claim rejection: not-found-style, with the specific
    /// reason as the machine-readable code.
    pub fn claim_rejected(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            code: self.code.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<IssuanceError> for ApiError {
    fn from(err: IssuanceError) -> Self {
        match &err {
            // Every claim rejection maps to a not-found-style response
            // with the specific reason as the code.
            IssuanceError::AlreadyClaimed { .. } => {
                Self::claim_rejected("ALREADY_CLAIMED", err.to_string())
            }
            IssuanceError::CouponNotFound { .. } => {
                Self::claim_rejected("COUPON_NOT_FOUND", err.to_string())
            }
            IssuanceError::QuotaExhausted { .. } => {
                Self::claim_rejected("QUOTA_EXHAUSTED", err.to_string())
            }
            IssuanceError::SweepInProgress { .. } => {
                Self::conflict("SWEEP_IN_PROGRESS", err.to_string())
            }
            IssuanceError::ClaimStore { .. } | IssuanceError::Core(_) => {
                tracing::error!(error = %err, "internal error on API path");
                Self::internal("internal error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surge_core::{CouponId, UserId};

    #[test]
    fn claim_rejections_map_to_not_found() {
        let err: ApiError = IssuanceError::AlreadyClaimed {
            coupon_id: CouponId::new(7),
            user_id: UserId::new(1),
        }
        .into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "ALREADY_CLAIMED");

        let err: ApiError = IssuanceError::QuotaExhausted {
            coupon_id: CouponId::new(7),
            max_quantity: 10,
        }
        .into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "QUOTA_EXHAUSTED");

        let err: ApiError = IssuanceError::CouponNotFound {
            coupon_id: CouponId::new(7),
        }
        .into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "COUPON_NOT_FOUND");
    }

    #[test]
    fn store_failures_are_internal_and_opaque() {
        let err: ApiError = IssuanceError::claim_store("connection refused").into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "INTERNAL");
        // The client never sees backend details.
        assert_eq!(err.message, "internal error");
    }

    #[test]
    fn contended_sweep_is_a_conflict() {
        let err: ApiError = IssuanceError::SweepInProgress {
            scope: "day:2026-08-05".into(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "SWEEP_IN_PROGRESS");
    }
}
