//! Command dispatch specs: allow-list, malformed input, argument checks.

use crate::prelude::Daemon;
use serde_json::json;
use serial_test::serial;

#[test]
#[serial]
fn disallowed_command_is_refused_with_exact_message() {
    let daemon = Daemon::start();

    let response = daemon.send(json!({"type": "rm -rf", "args": {}}));

    assert_eq!(response["success"], false);
    assert_eq!(
        response["message"],
        "invalid command: command not allowed: rm -rf"
    );
}

#[test]
#[serial]
fn malformed_json_gets_no_response_at_all() {
    let daemon = Daemon::start();

    let raw = daemon.send_raw(b"definitely not json");
    assert!(raw.is_empty(), "expected silent close, got: {raw:?}");

    // The daemon survives and answers the next connection.
    let response = daemon.send(json!({"type": "health", "args": {}}));
    assert_eq!(response["success"], true);
}

#[test]
#[serial]
fn health_reports_monitored_apps() {
    let daemon = Daemon::start();

    let response = daemon.send(json!({"type": "health", "args": {}}));

    assert_eq!(response["success"], true);
    assert!(response["data"]["apps"].as_array().unwrap().is_empty());
}

#[test]
#[serial]
fn missing_required_argument_is_a_clean_failure() {
    let daemon = Daemon::start();

    let response = daemon.send(json!({"type": "ship", "args": {}}));

    assert_eq!(response["success"], false);
    assert_eq!(response["message"], "missing required argument: tarball");
}

#[test]
#[serial]
fn args_may_be_omitted_entirely() {
    let daemon = Daemon::start();

    let response = daemon.send(json!({"type": "health"}));
    assert_eq!(response["success"], true);
}
