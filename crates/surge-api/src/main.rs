//! Surge API server entry point.
//!
//! Wires the in-memory backends behind the core traits, starts the daily
//! sweep schedule, and serves the HTTP API. Production deployments swap
//! the store and claim-store implementations at this seam.

use std::net::SocketAddr;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;

use surge_core::observability::init_logging;
use surge_core::{AtomicStateStore, Error, MemoryStateStore, Result};
use surge_issuance::claim_store::{ClaimStore, InMemoryClaimStore};
use surge_issuance::coupon::CouponQuota;
use surge_issuance::metadata::{CouponMetadataProvider, InMemoryCouponCatalog};
use surge_issuance::reconcile::Reconciler;
use surge_issuance::schedule::SweepSchedule;
use surge_issuance::service::IssuanceService;

use surge_api::config::ApiConfig;
use surge_api::server::{AppState, router};

fn seed_catalog(config: &ApiConfig) -> Result<InMemoryCouponCatalog> {
    let Some(raw) = &config.seed_coupons else {
        return Ok(InMemoryCouponCatalog::new());
    };

    let coupons: Vec<CouponQuota> = serde_json::from_str(raw)
        .map_err(|e| Error::configuration(format!("invalid SURGE_SEED_COUPONS: {e}")))?;

    tracing::info!(count = coupons.len(), "seeding coupon catalog");
    Ok(InMemoryCouponCatalog::with_coupons(coupons))
}

fn install_metrics_exporter(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .map_err(|e| Error::configuration(format!("failed to install metrics exporter: {e}")))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ApiConfig::from_env()?;
    init_logging(config.log_format);

    if let Some(port) = config.metrics_port {
        install_metrics_exporter(port)?;
    }

    let store: Arc<dyn AtomicStateStore> = Arc::new(MemoryStateStore::new());
    let claims: Arc<dyn ClaimStore> = Arc::new(InMemoryClaimStore::new());
    let catalog: Arc<dyn CouponMetadataProvider> = Arc::new(seed_catalog(&config)?);

    let issuance = Arc::new(IssuanceService::new(
        Arc::clone(&store),
        Arc::clone(&catalog),
    ));
    let reconciler = Arc::new(Reconciler::new(store, claims, catalog));

    let schedule = SweepSchedule::new(&config.sweep_cron)
        .map_err(|e| Error::configuration(format!("invalid sweep cron: {e}")))?;
    tokio::spawn(schedule.run(Arc::clone(&reconciler)));

    let app = router(AppState::new(issuance, reconciler));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "surge-api listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::configuration(format!("failed to bind: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::configuration(format!("server error: {e}")))
}
