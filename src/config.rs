//! Environment-driven configuration.

use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: Option<String>,
    pub port: u16,
    pub nats_url: Option<String>,
    /// Directory blobs are written beneath.
    pub blob_root: PathBuf,
    /// Public URL prefix uploaded blobs are served under.
    pub public_base_url: String,
    /// Shared secret for the cleanup cron endpoint; unset disables it.
    pub cron_secret: Option<String>,
    /// Days delivered/cancelled orders keep their design blobs.
    pub retention_days: i64,
    /// Flat shipping fee in minor units. Currently a free-shipping policy.
    pub shipping_fee: i64,
    /// Dev-only bearer token mapped to an admin user when no database is
    /// configured.
    pub dev_token: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").ok(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8084".to_string())
                .parse()?,
            nats_url: std::env::var("NATS_URL").ok(),
            blob_root: std::env::var("BLOB_ROOT")
                .unwrap_or_else(|_| "./blobs".to_string())
                .into(),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8084/blobs".to_string()),
            cron_secret: std::env::var("CRON_SECRET").ok(),
            retention_days: std::env::var("DESIGN_RETENTION_DAYS")
                .unwrap_or_else(|_| "90".to_string())
                .parse()?,
            shipping_fee: std::env::var("SHIPPING_FEE")
                .unwrap_or_else(|_| "0".to_string())
                .parse()?,
            dev_token: std::env::var("DEV_TOKEN").ok(),
        })
    }
}
