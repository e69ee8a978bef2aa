// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reverse-proxy setup handler.

use nd_adapters::{ContainerRuntime, HealthProbe, ProxyManager, ServiceManager};
use nd_core::Clock;
use serde_json::{Map, Value};

use crate::protocol::Response;

use super::{optional_bool, try_args, try_op, ListenCtx};

/// `setupCaddy`: stitch the import directive into the main config and
/// reload the proxy.
pub(super) async fn handle_setup_caddy<R, S, P, H, C>(
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
    if !try_args!(optional_bool(args, "setup")) {
        return Response::err("setupCaddy requires setup: true");
    }

    let appended = try_op!(ctx.proxy.ensure_import().await);
    try_op!(ctx.proxy.reload().await);

    if appended {
        Response::ok("caddy import directive installed and proxy reloaded")
    } else {
        Response::ok("caddy already configured; proxy reloaded")
    }
}

#[cfg(test)]
#[path = "proxy_tests.rs"]
mod tests;
