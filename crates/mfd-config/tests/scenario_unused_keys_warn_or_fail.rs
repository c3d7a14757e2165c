//! Unused-key guard.
//!
//! - Typos and unknown sections are reported in Warn mode without failing.
//! - Fail mode turns the same report into an error.
//! - The shipped defaults file is fully consumed.

use mfd_config::{load_layered_yaml, load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

const WITH_TYPO: &str = r#"
daemon:
  bind_addr: "0.0.0.0:8899"
settlement:
  timezon: "UTC"
printer:
  device: "/dev/usb/lp0"
"#;

#[test]
fn warn_mode_reports_unused_keys_without_error() {
    let loaded = load_layered_yaml_from_strings(&[WITH_TYPO]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)
        .expect("warn mode must not error");

    assert!(!report.is_clean());
    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/printer/device".to_string(), "/settlement/timezon".to_string()],
        "unused pointers are sorted and exclude consumed keys"
    );
}

#[test]
fn fail_mode_errors_on_unused_keys() {
    let loaded = load_layered_yaml_from_strings(&[WITH_TYPO]).unwrap();
    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("CONFIG_UNUSED_KEYS"), "got: {msg}");
    assert!(msg.contains("/settlement/timezon"), "got: {msg}");
}

#[test]
fn shipped_defaults_are_fully_consumed() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/defaults/frontdesk.yaml");
    let loaded = load_layered_yaml(&[path]).expect("defaults load");
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail)
        .expect("defaults must not carry unused keys");
    assert!(report.is_clean());

    let cfg = loaded.frontdesk().unwrap();
    cfg.validate().unwrap();
}
