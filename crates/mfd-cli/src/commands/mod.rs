//! Command handler modules for mfd-cli.
//!
//! Shared parsing helpers live here; command-specific logic lives in the
//! submodules.

pub mod catalog;
pub mod rate;
pub mod runtime;
pub mod shift;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use mfd_settlement::{Money, Rate};
use uuid::Uuid;

pub fn parse_uuid(flag: &str, raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).with_context(|| format!("invalid {flag} uuid: {raw}"))
}

pub fn parse_money(flag: &str, raw: &str) -> Result<Money> {
    Money::parse(raw.trim()).with_context(|| format!("invalid {flag} amount: {raw}"))
}

pub fn parse_rate(flag: &str, raw: &str) -> Result<Rate> {
    Rate::parse(raw.trim()).with_context(|| format!("invalid {flag} value: {raw}"))
}

pub fn opt_dt(dt: &Option<DateTime<Utc>>) -> String {
    dt.as_ref().map(|d| d.to_rfc3339()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_flags_reject_garbage_and_excess_precision() {
        assert_eq!(parse_money("--opening-cash", " 500 ").unwrap(), Money::from_micros(500_000_000));
        assert!(parse_money("--opening-cash", "5oo").is_err());
        assert!(parse_money("--opening-cash", "1.0000001").is_err());
    }

    #[test]
    fn uuid_error_names_the_flag() {
        let err = parse_uuid("--shift-id", "nope").unwrap_err();
        assert!(err.to_string().contains("--shift-id"));
    }
}
