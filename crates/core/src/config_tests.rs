// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn user_defaults_live_under_home() {
    let config = DaemonConfig::user_defaults(Path::new("/home/deploy"));

    assert_eq!(
        config.socket_path,
        PathBuf::from("/home/deploy/.nextdeploy/daemon.sock")
    );
    assert_eq!(
        config.apps_root,
        PathBuf::from("/home/deploy/.nextdeploy/apps")
    );
    assert_eq!(config.socket_mode, 0o660);
    assert_eq!(config.container_prefix, "nextdeploy-");
}

#[test]
fn system_defaults_live_under_var() {
    let config = DaemonConfig::system_defaults();

    assert_eq!(config.socket_path, PathBuf::from("/var/run/nextdeploy.sock"));
    assert_eq!(
        config.systemd_unit_dir,
        PathBuf::from("/etc/systemd/system")
    );
    assert_eq!(
        config.caddy_sites_dir,
        PathBuf::from("/etc/caddy/nextdeploy.d")
    );
    assert_eq!(config.blue_port, 3001);
    assert_eq!(config.green_port, 3002);
}

#[test]
fn config_file_overrides_subset_of_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"container_prefix": "acme-", "monitor_tick_secs": 5}"#,
    )
    .unwrap();

    let config = DaemonConfig::from_file(&path).unwrap();
    assert_eq!(config.container_prefix, "acme-");
    assert_eq!(config.monitor_tick_secs, 5);
    // Untouched fields keep their defaults.
    assert_eq!(config.docker_bin, "docker");
}

#[test]
fn explicit_missing_path_is_an_error() {
    let err = DaemonConfig::load(Some(Path::new("/nonexistent/ndd.json"))).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

#[test]
fn malformed_config_file_is_a_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{not json").unwrap();

    let err = DaemonConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}
