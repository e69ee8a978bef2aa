// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use tempfile::tempdir;

fn test_config(dir: &std::path::Path) -> DaemonConfig {
    DaemonConfig::rooted_at(dir.join("state"))
}

#[tokio::test]
async fn startup_binds_socket_with_tight_permissions() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let result = startup(&config).unwrap();

    let socket_mode = std::fs::metadata(&config.socket_path)
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(socket_mode & 0o777, 0o660);

    let dir_mode = std::fs::metadata(config.socket_path.parent().unwrap())
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(dir_mode & 0o777, 0o700);

    // PID file holds our pid.
    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());

    drop(result);
}

#[tokio::test]
async fn second_startup_fails_on_held_lock() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let _first = startup(&config).unwrap();
    let err = startup(&config).unwrap_err();
    assert!(matches!(err, LifecycleError::LockFailed(_)));

    // The running daemon's files were not cleaned up.
    assert!(config.socket_path.exists());
    assert!(config.lock_path.exists());
}

#[tokio::test]
async fn stale_socket_is_replaced_at_startup() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(config.socket_path.parent().unwrap()).unwrap();
    std::fs::write(&config.socket_path, b"stale").unwrap();

    let result = startup(&config).unwrap();

    // It is a live socket now, not the stale regular file.
    let file_type = std::fs::symlink_metadata(&config.socket_path)
        .unwrap()
        .file_type();
    assert!(file_type.is_socket());
    drop(result);
}

#[tokio::test]
async fn cleanup_removes_socket_and_pid() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let result = startup(&config).unwrap();
    drop(result); // releases the lock
    cleanup(&config);

    assert!(!config.socket_path.exists());
    assert!(!config.lock_path.exists());
}

#[tokio::test]
async fn startup_repairs_missing_current_links() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    // An app with releases but no current pointer (operator deleted it).
    let releases = config.apps_root.join("demo/releases");
    std::fs::create_dir_all(releases.join("100")).unwrap();
    std::fs::create_dir_all(releases.join("200")).unwrap();
    // And an app dir that never shipped a release.
    std::fs::create_dir_all(config.apps_root.join("empty")).unwrap();

    let _result = startup(&config).unwrap();

    let current = std::fs::read_link(config.apps_root.join("demo/current")).unwrap();
    assert_eq!(current, releases.join("200"));
    assert!(!config.apps_root.join("empty/current").exists());
}

#[tokio::test]
async fn apps_root_is_created() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let _result = startup(&config).unwrap();
    assert!(config.apps_root.is_dir());
}
