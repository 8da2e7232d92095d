#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;

use scopewatch_core::{ConfigError, ScopewatchConfig};
use tempfile::TempDir;

#[test]
fn test_load_reads_file_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scopewatch.toml");
    fs::write(
        &path,
        r#"
        request_placeholder = "-"
        unwind_on_audit_end = true
        "#,
    )
    .unwrap();

    let cfg = ScopewatchConfig::load(&path).unwrap();

    assert_eq!(cfg.request_placeholder, "-");
    assert_eq!(cfg.service_instance_placeholder, "??");
    assert!(cfg.unwind_on_audit_end);
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let err = ScopewatchConfig::load(&path).unwrap_err();

    assert!(matches!(err, ConfigError::Io { .. }));
    assert_eq!(err.code(), "ERR_CONFIG_IO");
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn test_load_optional_missing_file_is_none() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    assert_eq!(ScopewatchConfig::load_optional(&path).unwrap(), None);
}

#[test]
fn test_load_optional_malformed_file_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "emit_begin_records = \"yes\"").unwrap();

    let err = ScopewatchConfig::load_optional(&path).unwrap_err();

    assert_eq!(err.code(), "ERR_CONFIG_PARSE");
}

#[test]
fn test_invalid_placeholder_in_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scopewatch.toml");
    fs::write(&path, "unknown_placeholder = \"\"").unwrap();

    let err = ScopewatchConfig::load(&path).unwrap_err();

    assert_eq!(err.code(), "ERR_CONFIG_INVALID");
    assert!(err.to_string().contains("unknown_placeholder"));
}
