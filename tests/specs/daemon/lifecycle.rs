//! Daemon lifecycle specs: startup, socket hygiene, stopdaemon.

use crate::prelude::Daemon;
use serde_json::json;
use serial_test::serial;
use std::time::Duration;

#[test]
#[serial]
fn socket_has_owner_group_only_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let daemon = Daemon::start();

    let mode = std::fs::metadata(daemon.socket_path())
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o660);
}

#[test]
#[serial]
fn stopdaemon_shuts_down_and_removes_the_socket() {
    let mut daemon = Daemon::start();

    let response = daemon.send(json!({"type": "stopdaemon", "args": {}}));
    assert_eq!(response["success"], true);

    assert!(
        daemon.wait_for_exit(Duration::from_secs(10)),
        "daemon did not exit after stopdaemon"
    );
    assert!(
        !daemon.socket_path().exists(),
        "socket file left behind after shutdown"
    );
}

#[test]
#[serial]
fn version_flag_prints_and_exits() {
    let output = std::process::Command::new(assert_cmd::cargo::cargo_bin("ndd"))
        .arg("--version")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("ndd "));
}

#[test]
#[serial]
fn unexpected_argument_fails_fast() {
    let output = std::process::Command::new(assert_cmd::cargo::cargo_bin("ndd"))
        .arg("--bogus")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unexpected argument"));
}
