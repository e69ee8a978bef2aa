// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traffic-switch handlers: pull-and-switch, swap, rollback.

use nd_adapters::{ContainerRuntime, HealthProbe, ProxyManager, ServiceManager};
use nd_core::Clock;
use nd_engine::container_base_name;
use serde_json::{json, Map, Value};

use crate::protocol::Response;

use super::{optional_bool, optional_str, require_str, try_args, try_op, ListenCtx};

/// `pull`: fetch a new image and move traffic to it, either by the
/// standard stop-and-replace or the blue/green protocol.
pub(super) async fn handle_pull<R, S, P, H, C>(
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
    let new_app = try_args!(optional_bool(args, "newapp"));
    let blue_green = try_args!(optional_bool(args, "bluegreen"));
    let container = try_args!(optional_str(args, "name")).unwrap_or_else(|| {
        format!(
            "{}{}",
            ctx.config.container_prefix,
            container_base_name(&image)
        )
    });
    let domain =
        try_args!(optional_str(args, "domain")).unwrap_or_else(|| "localhost".to_string());

    try_op!(ctx.runtime.pull(&image).await);

    if blue_green {
        let new_name = try_op!(
            ctx.switcher
                .blue_green_switch(&container, &image, &domain, new_app)
                .await
        );
        Response::ok_with(
            format!("blue/green switch complete: {new_name} is live"),
            json!({ "container": new_name, "image": image }),
        )
    } else {
        try_op!(ctx.switcher.standard_switch(&container, &image, new_app).await);
        Response::ok_with(
            format!("container {container} now runs {image}"),
            json!({ "container": container, "image": image }),
        )
    }
}

pub(super) async fn handle_swap<R, S, P, H, C>(
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
    let from = try_args!(require_str(args, "from"));
    let to = try_args!(require_str(args, "to"));
    if from == to {
        return Response::err("cannot swap a container with itself");
    }

    try_op!(ctx.switcher.swap(&from, &to).await);
    Response::ok(format!("containers {from} and {to} swapped"))
}

pub(super) async fn handle_rollback<R, S, P, H, C>(
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
    let backup = try_op!(ctx.switcher.rollback(&container).await);
    Response::ok_with(
        format!("rolled back {container}; replaced version kept as {backup}"),
        json!({ "container": container, "backup": backup }),
    )
}

#[cfg(test)]
#[path = "switching_tests.rs"]
mod tests;
