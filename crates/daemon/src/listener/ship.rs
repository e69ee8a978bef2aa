// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ship handler: tarball in, live app out.

use std::path::PathBuf;

use nd_adapters::{ContainerRuntime, HealthProbe, ProxyManager, ServiceManager};
use nd_core::Clock;
use serde_json::{json, Map, Value};

use crate::protocol::Response;

use super::{optional_str, require_str, try_args, try_op, ListenCtx};

pub(super) async fn handle_ship<R, S, P, H, C>(
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
    let tarball = PathBuf::from(try_args!(require_str(args, "tarball")));
    let doppler_token = try_args!(optional_str(args, "dopplerToken"));

    let outcome = try_op!(ctx.shipper.ship(&tarball, doppler_token.as_deref()).await);

    Response::ok_with(
        format!(
            "App {} deployed successfully to {}",
            outcome.app_name, outcome.domain
        ),
        json!({
            "app": outcome.app_name,
            "domain": outcome.domain,
            "release": outcome.release.timestamp,
            "unit": outcome.unit,
        }),
    )
}

#[cfg(test)]
#[path = "ship_tests.rs"]
mod tests;
