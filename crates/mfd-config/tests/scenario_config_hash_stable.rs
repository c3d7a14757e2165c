//! Config hash stability.
//!
//! - Same input → same hash.
//! - Key order inside YAML does not affect the hash.
//! - Any value change does.
//! - Loading from files matches loading from strings.

use std::io::Write;

use mfd_config::{load_layered_yaml, load_layered_yaml_from_strings};

const BASE_YAML: &str = r#"
daemon:
  bind_addr: "127.0.0.1:8899"
  request_timeout_secs: 15
settlement:
  timezone: "America/Mexico_City"
  require_same_day_rate: true
"#;

const BASE_YAML_REORDERED: &str = r#"
settlement:
  require_same_day_rate: true
  timezone: "America/Mexico_City"
daemon:
  request_timeout_secs: 15
  bind_addr: "127.0.0.1:8899"
"#;

const SITE_OVERLAY: &str = r#"
settlement:
  require_same_day_rate: false
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash.len(), 64, "sha256 hex digest");
}

#[test]
fn key_order_does_not_change_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(
        a.config_hash, b.config_hash,
        "reordered keys must canonicalize to the same hash"
    );
}

#[test]
fn overlay_changes_hash_and_value() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, SITE_OVERLAY]).unwrap();

    assert_ne!(base.config_hash, merged.config_hash);
    let cfg = merged.frontdesk().unwrap();
    assert!(!cfg.settlement.require_same_day_rate);
    assert_eq!(cfg.settlement.timezone, "America/Mexico_City");
}

#[test]
fn file_layers_match_string_layers() {
    let mut base = tempfile::NamedTempFile::new().unwrap();
    base.write_all(BASE_YAML.as_bytes()).unwrap();
    let mut overlay = tempfile::NamedTempFile::new().unwrap();
    overlay.write_all(SITE_OVERLAY.as_bytes()).unwrap();

    let base_path = base.path().to_str().unwrap().to_string();
    let overlay_path = overlay.path().to_str().unwrap().to_string();

    let from_files = load_layered_yaml(&[&base_path, &overlay_path]).unwrap();
    let from_strings = load_layered_yaml_from_strings(&[BASE_YAML, SITE_OVERLAY]).unwrap();
    assert_eq!(from_files.config_hash, from_strings.config_hash);
}

#[test]
fn missing_file_names_the_path() {
    let err = load_layered_yaml(&["/definitely/not/here/frontdesk.yaml"]).unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here/frontdesk.yaml"));
}
