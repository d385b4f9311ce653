//! Server configuration from the environment.

use surge_core::observability::LogFormat;
use surge_core::{Error, Result};
use surge_issuance::schedule::DAILY_SWEEP_CRON;

/// Runtime configuration for the API server.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Port the HTTP listener binds to.
    pub port: u16,
    /// Log output format.
    pub log_format: LogFormat,
    /// Cron expression for the in-process daily sweep.
    pub sweep_cron: String,
    /// Port for the Prometheus metrics exporter, if enabled.
    pub metrics_port: Option<u16>,
    /// JSON-encoded coupon definitions to seed the in-memory catalog with.
    pub seed_coupons: Option<String>,
}

impl ApiConfig {
    /// Loads configuration from environment variables.
    ///
    /// | Variable | Default | Meaning |
    /// |----------|---------|---------|
    /// | `PORT` / `SURGE_PORT` | `8080` | HTTP listener port |
    /// | `SURGE_LOG_FORMAT` | `pretty` | `json` or `pretty` |
    /// | `SURGE_SWEEP_CRON` | daily 03:00 UTC | Sweep schedule |
    /// | `SURGE_METRICS_PORT` | disabled | Prometheus exporter port |
    /// | `SURGE_SEED_COUPONS` | none | JSON array of coupon definitions |
    ///
    /// # Errors
    ///
    /// Returns an error when a set variable fails to parse.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            port: resolve_port()?,
            log_format: log_format_from_env(),
            sweep_cron: optional_env("SURGE_SWEEP_CRON")
                .unwrap_or_else(|| DAILY_SWEEP_CRON.to_string()),
            metrics_port: parse_port_env("SURGE_METRICS_PORT")?,
            seed_coupons: optional_env("SURGE_SEED_COUPONS"),
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parse_port_env(key: &str) -> Result<Option<u16>> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<u16>()
            .map(Some)
            .map_err(|_| Error::configuration(format!("invalid {key}"))),
        Err(_) => Ok(None),
    }
}

fn resolve_port() -> Result<u16> {
    if let Some(port) = parse_port_env("PORT")? {
        return Ok(port);
    }

    if let Some(port) = parse_port_env("SURGE_PORT")? {
        return Ok(port);
    }

    Ok(8080)
}

fn log_format_from_env() -> LogFormat {
    match std::env::var("SURGE_LOG_FORMAT") {
        Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    }
}
