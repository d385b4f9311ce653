//! Application state and router assembly.

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;

use surge_issuance::reconcile::Reconciler;
use surge_issuance::service::IssuanceService;

use crate::routes;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The public claim service.
    pub issuance: Arc<IssuanceService>,
    /// The write-behind reconciliation job.
    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    /// Creates application state from the two domain services.
    #[must_use]
    pub fn new(issuance: Arc<IssuanceService>, reconciler: Arc<Reconciler>) -> Self {
        Self {
            issuance,
            reconciler,
        }
    }
}

async fn health_handler() -> StatusCode {
    StatusCode::OK
}

/// Builds the API router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .merge(routes::coupons::router())
        .merge(routes::reconcile::router())
        .with_state(state)
}
