// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling control-socket I/O.
//!
//! The listener accepts connections and handles each in its own task:
//! rate-limit check, read one JSON command, dispatch through the
//! allow-list, write one JSON response. Handler panics are confined to
//! the connection.

mod containers;
mod daemon_ctl;
mod proxy;
mod ship;
mod switching;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use nd_adapters::{ContainerRuntime, HealthProbe, ProxyManager, ServiceManager};
use nd_core::{Clock, DaemonConfig};
use nd_engine::{HealthMonitor, ShipEngine, SwitchEngine};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::protocol::{self, Command, Response, CONNECTION_DEADLINE};
use crate::ratelimit::TokenBucket;

/// The closed command allow-list; anything else is rejected before
/// reaching a handler.
pub(crate) const ALLOWED_COMMANDS: &[&str] = &[
    "deploy",
    "ship",
    "listcontainers",
    "swapcontainers",
    "start",
    "stop",
    "restart",
    "remove",
    "pull",
    "inspect",
    "logs",
    "status",
    "health",
    "rollback",
    "setupCaddy",
    "stopdaemon",
    "restartDaemon",
];

/// Shared daemon context for all request handlers.
pub(crate) struct ListenCtx<R, S, P, H, C> {
    pub config: DaemonConfig,
    pub runtime: R,
    pub switcher: SwitchEngine<R, P, H, C>,
    pub shipper: ShipEngine<S, P, C>,
    pub monitor: HealthMonitor<R, H, C>,
    pub proxy: P,
    pub limiter: Mutex<TokenBucket>,
    pub shutdown: Arc<Notify>,
    pub restart_requested: AtomicBool,
}

/// Listener task for accepting socket connections.
pub(crate) struct Listener<R, S, P, H, C> {
    socket: UnixListener,
    ctx: Arc<ListenCtx<R, S, P, H, C>>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl<R, S, P, H, C> Listener<R, S, P, H, C>
where
    R: ContainerRuntime,
    S: ServiceManager,
    P: ProxyManager,
    H: HealthProbe,
    C: Clock,
{
    pub fn new(
        socket: UnixListener,
        ctx: Arc<ListenCtx<R, S, P, H, C>>,
        tracker: TaskTracker,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            socket,
            ctx,
            tracker,
            shutdown,
        }
    }

    /// Run the accept loop until shutdown, spawning a task per connection.
    /// Transient accept failures back off briefly and retry.
    pub async fn run(self) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("listener stopping");
                    return;
                }
                accepted = self.socket.accept() => {
                    match accepted {
                        Ok((stream, _)) => {
                            let ctx = Arc::clone(&self.ctx);
                            self.tracker.spawn(handle_connection(stream, ctx));
                        }
                        Err(e) => {
                            warn!("accept error: {}", e);
                            tokio::time::sleep(Duration::from_millis(100)).await;
                        }
                    }
                }
            }
        }
    }
}

/// Handle a single client connection under the connection deadline.
async fn handle_connection<R, S, P, H, C>(stream: UnixStream, ctx: Arc<ListenCtx<R, S, P, H, C>>)
where
    R: ContainerRuntime,
    S: ServiceManager,
    P: ProxyManager,
    H: HealthProbe,
    C: Clock,
{
    match tokio::time::timeout(CONNECTION_DEADLINE, handle_inner(stream, ctx)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("connection error: {}", e),
        // Deadline exceeded: the connection closes with no response.
        Err(_) => warn!("connection deadline exceeded"),
    }
}

async fn handle_inner<R, S, P, H, C>(
    mut stream: UnixStream,
    ctx: Arc<ListenCtx<R, S, P, H, C>>,
) -> Result<(), protocol::ProtocolError>
where
    R: ContainerRuntime,
    S: ServiceManager,
    P: ProxyManager,
    H: HealthProbe,
    C: Clock,
{
    // One request per connection, so the bucket charges per connection.
    if !ctx.limiter.lock().try_acquire(Instant::now()) {
        debug!("request refused by rate limiter");
        protocol::write_response(&mut stream, &Response::err("rate limit exceeded")).await?;
        return Ok(());
    }

    let (mut reader, mut writer) = stream.into_split();
    let command = match protocol::read_command(&mut reader).await {
        Ok(command) => command,
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!("client disconnected before sending a command");
            return Ok(());
        }
        // Malformed input gets no response; parser details never reach
        // unauthenticated callers.
        Err(protocol::ProtocolError::Malformed(e)) => {
            debug!("malformed command dropped: {}", e);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    info!(command = %command.kind, "received command");

    // Dispatch in its own task so a panicking handler cannot take the
    // daemon down; the panic is translated into a failure response.
    let kind = command.kind.clone();
    let dispatch_ctx = Arc::clone(&ctx);
    let response =
        match tokio::spawn(async move { dispatch(command, dispatch_ctx.as_ref()).await }).await {
            Ok(response) => response,
            Err(join_err) if join_err.is_panic() => {
                warn!(command = %kind, "handler panicked");
                Response::err(format!("internal error handling command: {kind}"))
            }
            Err(_) => Response::err(format!("command cancelled: {kind}")),
        };

    debug!(success = response.success, "sending response");
    protocol::write_response(&mut writer, &response).await?;
    Ok(())
}

/// Route a command to its handler; the allow-list is the authoritative
/// surface.
pub(crate) async fn dispatch<R, S, P, H, C>(
    command: Command,
    ctx: &ListenCtx<R, S, P, H, C>,
) -> Response
where
    R: ContainerRuntime,
    S: ServiceManager,
    P: ProxyManager,
    H: HealthProbe,
    C: Clock,
{
    let kind = command.kind.as_str();
    if !ALLOWED_COMMANDS.contains(&kind) {
        return Response::err(format!("invalid command: command not allowed: {kind}"));
    }

    let args = &command.args;
    match kind {
        "deploy" => containers::handle_deploy(ctx, args).await,
        "ship" => ship::handle_ship(ctx, args).await,
        "listcontainers" => containers::handle_list(ctx, args).await,
        "swapcontainers" => switching::handle_swap(ctx, args).await,
        "start" => containers::handle_start(ctx, args).await,
        "stop" => containers::handle_stop(ctx, args).await,
        "restart" => containers::handle_restart(ctx, args).await,
        "remove" => containers::handle_remove(ctx, args).await,
        "pull" => switching::handle_pull(ctx, args).await,
        "inspect" => containers::handle_inspect(ctx, args).await,
        "logs" => containers::handle_logs(ctx, args).await,
        "status" => containers::handle_status(ctx, args).await,
        "health" => containers::handle_health(ctx, args).await,
        "rollback" => switching::handle_rollback(ctx, args).await,
        "setupCaddy" => proxy::handle_setup_caddy(ctx, args).await,
        "stopdaemon" => daemon_ctl::handle_stop_daemon(ctx, args),
        "restartDaemon" => daemon_ctl::handle_restart_daemon(ctx, args),
        // Unreachable: the allow-list above is exhaustive.
        other => Response::err(format!("invalid command: command not allowed: {other}")),
    }
}

// ── Argument extraction ────────────────────────────────────────────────
//
// Handlers receive the raw args map and extract their own inputs; these
// helpers produce the failure response for the caller to return.

pub(crate) fn require_str(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<String, Response> {
    match args.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(_) => Err(Response::err(format!("invalid argument: {key} must be a non-empty string"))),
        None => Err(Response::err(format!("missing required argument: {key}"))),
    }
}

pub(crate) fn optional_str(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Option<String>, Response> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(Response::err(format!("invalid argument: {key} must be a string"))),
    }
}

pub(crate) fn optional_bool(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<bool, Response> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(Response::err(format!("invalid argument: {key} must be a boolean"))),
    }
}

pub(crate) fn optional_u32(
    args: &serde_json::Map<String, Value>,
    key: &str,
    default: u32,
) -> Result<u32, Response> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| Response::err(format!("invalid argument: {key} out of range"))),
        Some(_) => Err(Response::err(format!("invalid argument: {key} must be an integer"))),
    }
}

pub(crate) fn optional_str_list(
    args: &serde_json::Map<String, Value>,
    key: &str,
) -> Result<Vec<String>, Response> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(Response::err(format!(
                    "invalid argument: {key} must be a list of strings"
                ))),
            })
            .collect(),
        Some(_) => Err(Response::err(format!(
            "invalid argument: {key} must be a list of strings"
        ))),
    }
}

/// Early-return the failure response from an argument extractor.
macro_rules! try_args {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(response) => return response,
        }
    };
}

/// Early-return a failure response from a fallible operation.
macro_rules! try_op {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(e) => return crate::protocol::Response::err(e.to_string()),
        }
    };
}

pub(crate) use {try_args, try_op};


#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
