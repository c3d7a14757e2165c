//! Typed configuration consumed by the daemon and CLI.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use mfd_settlement::SettlementPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontDeskConfig {
    pub daemon: DaemonConfig,
    pub db: DbConfig,
    pub settlement: SettlementConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub bind_addr: String,
    /// Requests still running after this are dropped, rolling back any open
    /// settlement transaction.
    pub request_timeout_secs: u64,
    pub cors_origins: Vec<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8899".to_string(),
            request_timeout_secs: 15,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Name of the env var holding the database URL. The URL itself never
    /// appears in YAML.
    pub url_env: String,
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url_env: "MFD_DATABASE_URL".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// IANA zone used to decide whether a rate sample is from "today".
    pub timezone: String,
    pub require_same_day_rate: bool,
    pub local_currency: String,
    pub foreign_currency: String,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            require_same_day_rate: true,
            local_currency: "MXN".to_string(),
            foreign_currency: "USD".to_string(),
        }
    }
}

impl FrontDeskConfig {
    pub fn validate(&self) -> Result<()> {
        if self.daemon.request_timeout_secs == 0 {
            bail!("daemon.request_timeout_secs must be > 0");
        }
        if self.db.max_connections == 0 {
            bail!("db.max_connections must be > 0");
        }
        if self.db.url_env.trim().is_empty() {
            bail!("db.url_env must name an environment variable");
        }
        self.bind_addr()?;
        self.timezone()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.daemon
            .bind_addr
            .parse()
            .with_context(|| format!("invalid daemon.bind_addr: {}", self.daemon.bind_addr))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.daemon.request_timeout_secs)
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.settlement
            .timezone
            .parse::<Tz>()
            .map_err(|_| anyhow!("invalid settlement.timezone: {}", self.settlement.timezone))
    }

    pub fn settlement_policy(&self) -> Result<SettlementPolicy> {
        Ok(SettlementPolicy {
            timezone: self.timezone()?,
            require_same_day_rate: self.settlement.require_same_day_rate,
        })
    }
}
