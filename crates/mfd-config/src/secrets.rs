//! Runtime secret resolution.
//!
//! YAML carries only env var NAMES (`db.url_env`). Binaries call
//! [`resolve_secrets`] once at startup and pass the result on; values are
//! redacted in `Debug` and never appear in error messages.

use anyhow::{bail, Result};

use crate::FrontDeskConfig;

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Env var the URL was read from, for error messages.
    pub database_url_var: String,
    pub database_url: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("database_url_var", &self.database_url_var)
            .field("database_url", &self.database_url.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl ResolvedSecrets {
    pub fn require_database_url(&self) -> Result<&str> {
        match self.database_url.as_deref() {
            Some(url) => Ok(url),
            None => bail!(
                "SECRETS_MISSING: required env var '{}' (database url) is not set or empty",
                self.database_url_var
            ),
        }
    }
}

/// Unset and blank both resolve to `None`.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

pub fn resolve_secrets(cfg: &FrontDeskConfig) -> ResolvedSecrets {
    let var = cfg.db.url_env.trim().to_string();
    ResolvedSecrets {
        database_url: resolve_env(&var),
        database_url_var: var,
    }
}
