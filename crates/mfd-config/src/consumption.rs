//! Unused-key guard.
//!
//! "Consumed pointers" are JSON Pointer prefixes that `FrontDeskConfig` (or a
//! binary) actually reads. A leaf under any consumed prefix is used; any other
//! leaf is reported so typos like `settlement.timezon` do not pass silently.

use std::collections::BTreeSet;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collect_leaf_pointers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Consumed prefixes used for this analysis (sorted, unique).
    pub consumed_prefixes: Vec<String>,
    /// Unused leaf pointers (sorted).
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Everything `FrontDeskConfig` deserializes. Keep in step with `frontdesk.rs`.
pub fn consumed_pointers() -> &'static [&'static str] {
    &[
        "/daemon/bind_addr",
        "/daemon/request_timeout_secs",
        "/daemon/cors_origins",
        "/db/url_env",
        "/db/max_connections",
        "/settlement/timezone",
        "/settlement/require_same_day_rate",
        "/settlement/local_currency",
        "/settlement/foreign_currency",
    ]
}

/// With `Fail`, unused keys are an error; with `Warn` the report is returned.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let consumed: BTreeSet<String> = consumed_pointers()
        .iter()
        .map(|p| normalize_pointer(p))
        .collect();
    let consumed_prefixes: Vec<String> = consumed.into_iter().collect();

    let mut leaves = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|leaf| !consumed_prefixes.iter().any(|cp| is_prefix_pointer(cp, leaf)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        consumed_prefixes,
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        let preview: Vec<&String> = report.unused_leaf_pointers.iter().take(12).collect();
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected. \
             Remove them or update the consumed registry. First few: {:?}",
            report.unused_leaf_pointers.len(),
            preview
        );
    }

    Ok(report)
}

fn normalize_pointer(p: &str) -> String {
    let mut s = p.trim().to_string();
    if !s.starts_with('/') {
        s.insert(0, '/');
    }
    while s.ends_with('/') && s.len() > 1 {
        s.pop();
    }
    s
}

/// "/a/b" covers "/a/b" and "/a/b/c" but not "/a/bc".
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if prefix == "/" || leaf == prefix {
        return true;
    }
    leaf.strip_prefix(prefix)
        .map_or(false, |rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_boundary() {
        assert!(is_prefix_pointer("/daemon/cors_origins", "/daemon/cors_origins/0"));
        assert!(!is_prefix_pointer("/db/url", "/db/url_env"));
        assert!(is_prefix_pointer("/", "/anything"));
    }

    #[test]
    fn empty_document_is_clean() {
        let report = report_unused_keys(&serde_json::json!({}), UnusedKeyPolicy::Fail).unwrap();
        assert!(report.is_clean());
    }
}
