// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon control handlers.

use std::sync::atomic::Ordering;

use serde_json::{Map, Value};
use tracing::info;

use crate::protocol::Response;

use super::ListenCtx;

pub(super) fn handle_stop_daemon<R, S, P, H, C>(
    ctx: &ListenCtx<R, S, P, H, C>,
    _args: &Map<String, Value>,
) -> Response {
    info!("shutdown requested via command");
    ctx.shutdown.notify_one();
    Response::ok("daemon stopping")
}

pub(super) fn handle_restart_daemon<R, S, P, H, C>(
    ctx: &ListenCtx<R, S, P, H, C>,
    _args: &Map<String, Value>,
) -> Response {
    info!("restart requested via command");
    ctx.restart_requested.store(true, Ordering::SeqCst);
    ctx.shutdown.notify_one();
    Response::ok("daemon restarting")
}
