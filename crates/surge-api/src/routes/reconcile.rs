//! On-demand reconciliation trigger.
//!
//! ## Routes
//!
//! - `POST /internal/reconcile/run` - Sweep the previous UTC day's staged
//!   claims immediately
//!
//! This is the same sweep the in-process schedule fires daily; the route
//! exists so operators and external job runners can trigger or re-run a
//! window on demand. Per-record failures are reported inside the summary,
//! not as an HTTP error.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;

use surge_issuance::reconcile::SweepSummary;
use surge_issuance::schedule::previous_day;

use crate::error::ApiResult;
use crate::server::AppState;

/// Builds the reconcile routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/internal/reconcile/run", post(run_sweep))
}

/// `POST /internal/reconcile/run` - sweep the previous day's window.
async fn run_sweep(State(state): State<AppState>) -> ApiResult<Json<SweepSummary>> {
    let now = Utc::now();
    let summary = state.reconciler.sweep_day(previous_day(now), now).await?;
    Ok(Json(summary))
}
