//! Config and database wiring shared by the DB-backed commands.
//!
//! Layers come from `MFD_CONFIG` when set, else the shipped defaults file
//! when run from the repo root, else the built-in defaults. The database URL
//! is read from the env var named by `db.url_env`.

use std::path::Path;

use anyhow::Result;
use mfd_config::{resolve_secrets, FrontDeskConfig, ENV_CONFIG_PATHS};
use mfd_settlement::SettlementPolicy;
use sqlx::PgPool;
use tracing::debug;

pub const DEFAULT_CONFIG: &str = "config/defaults/frontdesk.yaml";

pub struct Runtime {
    pub cfg: FrontDeskConfig,
    pub policy: SettlementPolicy,
}

impl Runtime {
    pub fn load() -> Result<Self> {
        let explicit = std::env::var(ENV_CONFIG_PATHS)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);

        let cfg = if explicit || Path::new(DEFAULT_CONFIG).exists() {
            let loaded = mfd_config::load_from_env(&[DEFAULT_CONFIG])?;
            debug!(config_hash = %loaded.config_hash, "config loaded");
            loaded.frontdesk()?
        } else {
            debug!("no config layers found; using built-in defaults");
            FrontDeskConfig::default()
        };
        Self::from_config(cfg)
    }

    pub fn from_config(cfg: FrontDeskConfig) -> Result<Self> {
        cfg.validate()?;
        let policy = cfg.settlement_policy()?;
        Ok(Self { cfg, policy })
    }

    pub async fn connect(&self) -> Result<PgPool> {
        let secrets = resolve_secrets(&self.cfg);
        mfd_db::connect(secrets.require_database_url()?, self.cfg.db.max_connections).await
    }
}
