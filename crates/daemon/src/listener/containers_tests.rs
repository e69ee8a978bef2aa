// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::super::test_support::{dispatch_json, test_harness};
use nd_adapters::RuntimeCall;
use nd_core::{DesiredState, RestartPolicy};
use serde_json::json;

#[tokio::test]
async fn deploy_pulls_runs_and_registers() {
    let h = test_harness();

    let response = dispatch_json(
        &h,
        json!({"type": "deploy", "args": {
            "image": "registry.io/team/web:2",
            "ports": ["3001:3000"],
            "env": ["NODE_ENV=production"],
        }}),
    )
    .await;

    assert!(response.success, "{}", response.message);
    // Name defaults to prefix + image base name.
    let container = h.runtime.container("nextdeploy-web").unwrap();
    assert_eq!(container.image, "registry.io/team/web:2");
    assert_eq!(container.ports, vec!["3001:3000"]);
    assert!(h
        .runtime
        .calls()
        .contains(&RuntimeCall::Pull {
            image: "registry.io/team/web:2".to_string()
        }));

    let apps = h.ctx.monitor.snapshot();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].name, "nextdeploy-web");
    assert_eq!(apps[0].restart_policy, RestartPolicy::Always);
}

#[tokio::test]
async fn deploy_skips_pull_when_image_is_local() {
    let h = test_harness();
    h.runtime.add_image("web:1");

    let response = dispatch_json(
        &h,
        json!({"type": "deploy", "args": {"image": "web:1", "name": "custom"}}),
    )
    .await;

    assert!(response.success);
    assert!(h.runtime.container("custom").is_some());
    assert!(!h
        .runtime
        .calls()
        .contains(&RuntimeCall::Pull {
            image: "web:1".to_string()
        }));
}

#[tokio::test]
async fn deploy_never_restart_policy_is_recorded() {
    let h = test_harness();
    h.runtime.add_image("web:1");

    dispatch_json(
        &h,
        json!({"type": "deploy", "args": {"image": "web:1", "restart": "never"}}),
    )
    .await;

    assert_eq!(
        h.ctx.monitor.snapshot()[0].restart_policy,
        RestartPolicy::Never
    );
}

#[tokio::test]
async fn deploy_without_image_is_a_validation_failure() {
    let h = test_harness();
    let response = dispatch_json(&h, json!({"type": "deploy", "args": {}})).await;
    assert!(!response.success);
    assert!(response.message.contains("missing required argument: image"));
}

#[tokio::test]
async fn start_stop_track_desired_state() {
    let h = test_harness();
    h.runtime.add_image("web:1");
    dispatch_json(&h, json!({"type": "deploy", "args": {"image": "web:1"}})).await;

    let response = dispatch_json(
        &h,
        json!({"type": "stop", "args": {"container": "nextdeploy-web"}}),
    )
    .await;
    assert!(response.success);
    assert_eq!(
        h.runtime.container("nextdeploy-web").unwrap().status,
        "exited"
    );
    assert_eq!(
        h.ctx.monitor.snapshot()[0].desired_state,
        DesiredState::Stopped
    );

    dispatch_json(
        &h,
        json!({"type": "start", "args": {"container": "nextdeploy-web"}}),
    )
    .await;
    assert_eq!(
        h.ctx.monitor.snapshot()[0].desired_state,
        DesiredState::Running
    );
}

#[tokio::test]
async fn remove_deregisters_from_monitoring() {
    let h = test_harness();
    h.runtime.add_image("web:1");
    dispatch_json(&h, json!({"type": "deploy", "args": {"image": "web:1"}})).await;

    // Running container needs force.
    let refused = dispatch_json(
        &h,
        json!({"type": "remove", "args": {"container": "nextdeploy-web"}}),
    )
    .await;
    assert!(!refused.success);

    let response = dispatch_json(
        &h,
        json!({"type": "remove", "args": {"container": "nextdeploy-web", "force": true}}),
    )
    .await;
    assert!(response.success);
    assert!(h.runtime.container("nextdeploy-web").is_none());
    assert!(h.ctx.monitor.snapshot().is_empty());
}

#[tokio::test]
async fn listcontainers_shows_only_managed_names() {
    let h = test_harness();
    h.runtime.add_container("nextdeploy-web", "web:1", "running");
    h.runtime.add_container("unrelated", "x:1", "running");
    h.runtime.add_container("nextdeploy-api", "api:1", "exited");

    let running = dispatch_json(&h, json!({"type": "listcontainers", "args": {}})).await;
    assert!(running.success);
    let containers = running.data.unwrap()["containers"].as_array().unwrap().len();
    assert_eq!(containers, 1);

    let all = dispatch_json(&h, json!({"type": "listcontainers", "args": {"all": true}})).await;
    let containers = all.data.unwrap()["containers"].as_array().unwrap().len();
    assert_eq!(containers, 2);
}

#[tokio::test]
async fn status_logs_and_inspect_surface_runtime_data() {
    let h = test_harness();
    h.runtime.add_container("nextdeploy-web", "web:1", "running");
    h.runtime.set_logs("nextdeploy-web", "line1\nline2\n");

    let status = dispatch_json(
        &h,
        json!({"type": "status", "args": {"container": "nextdeploy-web"}}),
    )
    .await;
    assert!(status.success);
    assert_eq!(status.data.unwrap()["status"], "running");

    let logs = dispatch_json(
        &h,
        json!({"type": "logs", "args": {"container": "nextdeploy-web", "lines": 2}}),
    )
    .await;
    assert!(logs.success);
    assert_eq!(logs.data.unwrap()["logs"], "line1\nline2\n");

    let inspect = dispatch_json(
        &h,
        json!({"type": "inspect", "args": {"container": "nextdeploy-web"}}),
    )
    .await;
    assert!(inspect.success);
    assert_eq!(inspect.data.unwrap()["State"]["Status"], "running");
}

#[tokio::test]
async fn status_of_missing_container_fails_cleanly() {
    let h = test_harness();
    let response = dispatch_json(
        &h,
        json!({"type": "status", "args": {"container": "ghost"}}),
    )
    .await;
    assert!(!response.success);
    assert!(response.message.contains("ghost"));
}

#[tokio::test]
async fn health_with_container_reports_runtime_health() {
    let h = test_harness();
    h.runtime.add_container("nextdeploy-web", "web:1", "running");
    h.runtime.set_health("nextdeploy-web", "unhealthy");

    let response = dispatch_json(
        &h,
        json!({"type": "health", "args": {"container": "nextdeploy-web"}}),
    )
    .await;
    assert!(response.success);
    assert!(response.message.contains("unhealthy"));
    assert_eq!(response.data.unwrap()["healthy"], false);
}

#[tokio::test]
async fn health_without_container_lists_monitored_apps() {
    let h = test_harness();
    h.runtime.add_image("web:1");
    dispatch_json(&h, json!({"type": "deploy", "args": {"image": "web:1"}})).await;

    let response = dispatch_json(&h, json!({"type": "health", "args": {}})).await;
    assert!(response.success);
    let apps = response.data.unwrap()["apps"].as_array().unwrap().len();
    assert_eq!(apps, 1);
}
