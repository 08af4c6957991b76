//! Server configuration.
//!
//! Loaded from environment variables (after `.env` has been applied by
//! `dotenvy`), with defaults for everything except the database URL.

use std::{env, path::PathBuf, time::Duration};

use chrono::Duration as ChronoDuration;
use thiserror::Error;

use crate::utils::barcode::CompanyPrefix;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Root directory for uploaded images and generated barcodes.
    pub upload_dir: PathBuf,
    pub company_prefix: CompanyPrefix,
    pub sweep_interval: Duration,
    /// How long a `pending` order without a delivery time waits before the
    /// sweep marks it completed.
    pub completion_window: ChronoDuration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let port = parse_var("PORT", 5000u16)?;
        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        let prefix_raw = env::var("COMPANY_PREFIX").unwrap_or_else(|_| "8901234".to_string());
        let company_prefix = CompanyPrefix::parse(&prefix_raw)
            .map_err(|e| ConfigError::InvalidValue("COMPANY_PREFIX", e.to_string()))?;

        let sweep_secs = parse_var("ORDER_SWEEP_INTERVAL_SECS", 900u64)?;
        if sweep_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "ORDER_SWEEP_INTERVAL_SECS",
                "must be greater than zero".to_string(),
            ));
        }
        let window_mins = parse_var("ORDER_COMPLETION_WINDOW_MINS", 120i64)?;

        Ok(Self {
            database_url,
            port,
            upload_dir,
            company_prefix,
            sweep_interval: Duration::from_secs(sweep_secs),
            completion_window: ChronoDuration::minutes(window_mins),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn parse_var<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        Err(_) => Ok(default),
    }
}
