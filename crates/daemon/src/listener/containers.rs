// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container lifecycle handlers.

use nd_adapters::{ContainerRuntime, HealthProbe, ProxyManager, RunSpec, ServiceManager};
use nd_core::{Clock, DesiredState, MonitoredApp, RestartPolicy};
use nd_engine::container_base_name;
use serde_json::{json, Map, Value};

use crate::protocol::Response;

use super::{
    optional_bool, optional_str, optional_str_list, optional_u32, require_str, try_args, try_op,
    ListenCtx,
};

pub(super) async fn handle_deploy<R, S, P, H, C>(
    ctx: &ListenCtx<R, S, P, H, C>,
    args: &Map<String, Value>,
) -> Response
where
    R: ContainerRuntime,
    S: ServiceManager,
    P: ProxyManager,
    H: HealthProbe,
    C: Clock,
{
    let image = try_args!(require_str(args, "image"));
    let name = try_args!(optional_str(args, "name")).unwrap_or_else(|| {
        format!(
            "{}{}",
            ctx.config.container_prefix,
            container_base_name(&image)
        )
    });
    let spec = RunSpec {
        ports: try_args!(optional_str_list(args, "ports")),
        env: try_args!(optional_str_list(args, "env")),
        volumes: try_args!(optional_str_list(args, "volumes")),
        restart: try_args!(optional_str(args, "restart")),
        command: try_args!(optional_str(args, "command")),
        image: image.clone(),
        name: name.clone(),
    };

    if !try_op!(ctx.runtime.image_exists(&image).await) {
        try_op!(ctx.runtime.pull(&image).await);
    }
    try_op!(ctx.runtime.run(&spec).await);

    let policy = match spec.restart.as_deref() {
        Some("no") | Some("never") => RestartPolicy::Never,
        Some("on-failure") => RestartPolicy::OnFailure,
        _ => RestartPolicy::Always,
    };
    ctx.monitor.register(MonitoredApp::new(&name, policy, -1));

    Response::ok_with(
        format!("container {name} deployed from {image}"),
        json!({ "container": name }),
    )
}

pub(super) async fn handle_list<R, S, P, H, C>(
    ctx: &ListenCtx<R, S, P, H, C>,
    args: &Map<String, Value>,
) -> Response
where
    R: ContainerRuntime,
    S: ServiceManager,
    P: ProxyManager,
    H: HealthProbe,
    C: Clock,
{
    let all = try_args!(optional_bool(args, "all"));
    let mut rows = try_op!(ctx.runtime.list(all).await);
    // Only workloads this daemon manages, picked out by name prefix.
    let prefix = &ctx.config.container_prefix;
    if !prefix.is_empty() {
        rows.retain(|row| row.name.starts_with(prefix));
    }

    let count = rows.len();
    Response::ok_with(
        format!("{count} container(s)"),
        json!({ "containers": rows }),
    )
}

pub(super) async fn handle_start<R, S, P, H, C>(
    ctx: &ListenCtx<R, S, P, H, C>,
    args: &Map<String, Value>,
) -> Response
where
    R: ContainerRuntime,
    S: ServiceManager,
    P: ProxyManager,
    H: HealthProbe,
    C: Clock,
{
    let container = try_args!(require_str(args, "container"));
    try_op!(ctx.runtime.start(&container).await);
    ctx.monitor.set_desired(&container, DesiredState::Running);
    Response::ok(format!("container {container} started"))
}

pub(super) async fn handle_stop<R, S, P, H, C>(
    ctx: &ListenCtx<R, S, P, H, C>,
    args: &Map<String, Value>,
) -> Response
where
    R: ContainerRuntime,
    S: ServiceManager,
    P: ProxyManager,
    H: HealthProbe,
    C: Clock,
{
    let container = try_args!(require_str(args, "container"));
    try_op!(ctx.runtime.stop(&container).await);
    ctx.monitor.set_desired(&container, DesiredState::Stopped);
    Response::ok(format!("container {container} stopped"))
}

pub(super) async fn handle_restart<R, S, P, H, C>(
    ctx: &ListenCtx<R, S, P, H, C>,
    args: &Map<String, Value>,
) -> Response
where
    R: ContainerRuntime,
    S: ServiceManager,
    P: ProxyManager,
    H: HealthProbe,
    C: Clock,
{
    let container = try_args!(require_str(args, "container"));
    try_op!(ctx.runtime.restart(&container).await);
    ctx.monitor.set_desired(&container, DesiredState::Running);
    Response::ok(format!("container {container} restarted"))
}

pub(super) async fn handle_remove<R, S, P, H, C>(
    ctx: &ListenCtx<R, S, P, H, C>,
    args: &Map<String, Value>,
) -> Response
where
    R: ContainerRuntime,
    S: ServiceManager,
    P: ProxyManager,
    H: HealthProbe,
    C: Clock,
{
    let container = try_args!(require_str(args, "container"));
    let force = try_args!(optional_bool(args, "force"));
    try_op!(ctx.runtime.remove(&container, force).await);
    ctx.monitor.deregister(&container);
    Response::ok(format!("container {container} removed"))
}

pub(super) async fn handle_inspect<R, S, P, H, C>(
    ctx: &ListenCtx<R, S, P, H, C>,
    args: &Map<String, Value>,
) -> Response
where
    R: ContainerRuntime,
    S: ServiceManager,
    P: ProxyManager,
    H: HealthProbe,
    C: Clock,
{
    let container = try_args!(require_str(args, "container"));
    let details = try_op!(ctx.runtime.inspect(&container).await);
    Response::ok_with(format!("container {container}"), details)
}

pub(super) async fn handle_logs<R, S, P, H, C>(
    ctx: &ListenCtx<R, S, P, H, C>,
    args: &Map<String, Value>,
) -> Response
where
    R: ContainerRuntime,
    S: ServiceManager,
    P: ProxyManager,
    H: HealthProbe,
    C: Clock,
{
    let container = try_args!(require_str(args, "container"));
    let lines = try_args!(optional_u32(args, "lines", 100));
    // `follow` is accepted for CLI compatibility; the one-shot socket
    // returns a bounded tail and the client re-polls.
    let _follow = try_args!(optional_bool(args, "follow"));

    let logs = try_op!(ctx.runtime.logs(&container, lines).await);
    Response::ok_with(
        format!("last {lines} line(s) of {container}"),
        json!({ "logs": logs }),
    )
}

pub(super) async fn handle_status<R, S, P, H, C>(
    ctx: &ListenCtx<R, S, P, H, C>,
    args: &Map<String, Value>,
) -> Response
where
    R: ContainerRuntime,
    S: ServiceManager,
    P: ProxyManager,
    H: HealthProbe,
    C: Clock,
{
    let container = try_args!(require_str(args, "container"));
    let status = try_op!(ctx.runtime.status(&container).await);
    Response::ok_with(
        format!("container {container} is {status}"),
        json!({ "container": container, "status": status }),
    )
}

pub(super) async fn handle_health<R, S, P, H, C>(
    ctx: &ListenCtx<R, S, P, H, C>,
    args: &Map<String, Value>,
) -> Response
where
    R: ContainerRuntime,
    S: ServiceManager,
    P: ProxyManager,
    H: HealthProbe,
    C: Clock,
{
    match try_args!(optional_str(args, "container")) {
        Some(container) => {
            let health = try_op!(ctx.runtime.health(&container).await);
            let message = if health.healthy {
                format!("container {container} is healthy")
            } else {
                format!("container {container} is unhealthy ({})", health.status)
            };
            Response::ok_with(message, json!(health))
        }
        None => {
            let apps = ctx.monitor.snapshot();
            Response::ok_with(
                format!("{} monitored app(s)", apps.len()),
                json!({ "apps": apps }),
            )
        }
    }
}

#[cfg(test)]
#[path = "containers_tests.rs"]
mod tests;
