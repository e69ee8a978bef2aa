// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NextDeploy Daemon (ndd)
//!
//! Background process that owns the deployment engine and serves the
//! control-plane socket.
//!
//! Architecture:
//! - Listener task: accepts socket connections, one task per request
//! - Health monitor task: periodic desired-vs-observed reconciliation
//! - Main task: signal handling and graceful shutdown

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
mod lifecycle;
mod listener;
mod protocol;
mod ratelimit;

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use nd_core::DaemonConfig;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::lifecycle::{LifecycleError, StartupResult, SHUTDOWN_GRACE};
use crate::listener::Listener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    let mut explicit_config: Option<PathBuf> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("ndd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("ndd {}", env!("CARGO_PKG_VERSION"));
                println!("NextDeploy Daemon - deployment orchestration for web apps");
                println!();
                println!("USAGE:");
                println!("    ndd [--config <path>]");
                println!();
                println!("The daemon is typically started by the `nextdeploy` CLI and");
                println!("should not be invoked directly. It listens on a Unix socket");
                println!("for commands from the CLI.");
                println!();
                println!("OPTIONS:");
                println!("        --config <path>  Use an explicit config file");
                println!("    -h, --help           Print help information");
                println!("    -v, --version        Print version information");
                return Ok(());
            }
            "--config" => match args.next() {
                Some(path) => explicit_config = Some(PathBuf::from(path)),
                None => {
                    eprintln!("error: --config requires a path");
                    std::process::exit(1);
                }
            },
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: ndd [--config <path> | --help | --version]");
                std::process::exit(1);
            }
        }
    }

    // Load configuration
    let config = match env::state_dir_override() {
        Some(dir) => DaemonConfig::rooted_at(dir),
        None => {
            let explicit = explicit_config.or_else(env::config_override);
            DaemonConfig::load(explicit.as_deref())?
        }
    };

    // Rotate log file if it has grown too large
    rotate_log_if_needed(&config.log_path);

    // Write startup marker to log (before tracing setup, so a CLI can
    // find where this startup attempt begins)
    write_startup_marker(&config)?;

    // Set up logging (tee to file + stdout)
    let _log_guard = setup_logging(&config)?;

    info!("starting daemon");

    let StartupResult {
        ctx,
        socket,
        lock_file: _lock_file,
    } = match lifecycle::startup(&config) {
        Ok(result) => result,
        Err(LifecycleError::LockFailed(_)) => {
            // Another daemon is already running — print a human-readable
            // message instead of a raw debug error.
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("ndd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            // Write the error synchronously (tracing is non-blocking and
            // may not flush before exit)
            write_startup_error(&config, &e);
            error!("failed to start daemon: {}", e);
            return Err(e.into());
        }
    };

    // Spawn the listener task; the tracker bounds the shutdown drain.
    let tracker = TaskTracker::new();
    let shutdown_token = CancellationToken::new();
    let listener = Listener::new(
        socket,
        Arc::clone(&ctx),
        tracker.clone(),
        shutdown_token.clone(),
    );
    tokio::spawn(listener.run());

    // Spawn the health observer.
    tokio::spawn(ctx.monitor.clone().run(shutdown_token.clone()));

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    info!("daemon ready, listening on {}", config.socket_path.display());

    // Signal ready for parent process (CLI waiting for startup)
    println!("READY");

    loop {
        tokio::select! {
            _ = ctx.shutdown.notified() => {
                info!("shutdown requested via command");
                break;
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down...");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down...");
                break;
            }
            _ = sighup.recv() => {
                // Reload is a logged no-op in this version.
                info!("received SIGHUP; configuration reload is not applied in place");
            }
        }
    }

    // Graceful shutdown: stop accepting, drain in-flight handlers within
    // the grace window, then remove the socket and PID files.
    shutdown_token.cancel();
    tracker.close();
    if tokio::time::timeout(SHUTDOWN_GRACE, tracker.wait())
        .await
        .is_err()
    {
        warn!("in-flight handlers exceeded the shutdown grace window");
    }
    lifecycle::cleanup(&config);
    info!("daemon stopped");

    if ctx.restart_requested.load(Ordering::SeqCst) {
        respawn_detached();
    }
    Ok(())
}

/// Re-exec the current binary detached, for `restartDaemon`.
fn respawn_detached() {
    let Ok(exe) = std::env::current_exe() else {
        error!("restart requested but current executable path is unknown");
        return;
    };
    let args: Vec<String> = std::env::args().skip(1).collect();
    match std::process::Command::new(exe).args(args).spawn() {
        Ok(child) => info!(pid = child.id(), "respawned daemon"),
        Err(e) => error!("failed to respawn daemon: {}", e),
    }
}

/// Log size that triggers rotation at startup (10 MB).
const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

/// Rotated files kept beside the live log.
const KEEP_ROTATED_LOGS: usize = 3;

/// Move an oversized daemon log aside before tracing reopens it.
///
/// The live file becomes `daemon.log.<epoch-secs>` and only the newest
/// [`KEEP_ROTATED_LOGS`] rotated files survive. Every step is
/// best-effort; a failed rotation never blocks startup.
fn rotate_log_if_needed(log_path: &Path) {
    match std::fs::metadata(log_path) {
        Ok(meta) if meta.len() >= MAX_LOG_BYTES => {}
        _ => return,
    }

    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let rotated = log_path.with_extension(format!("log.{stamp}"));
    let _ = std::fs::rename(log_path, rotated);

    prune_rotated_logs(log_path);
}

/// Delete rotated logs beyond the newest [`KEEP_ROTATED_LOGS`].
fn prune_rotated_logs(log_path: &Path) {
    let Some(dir) = log_path.parent() else { return };
    let Some(base) = log_path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return;
    };
    let prefix = format!("{base}.");
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    let mut rotated: Vec<(u64, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let stamp: u64 = name.strip_prefix(&prefix)?.parse().ok()?;
            Some((stamp, entry.path()))
        })
        .collect();
    rotated.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, stale) in rotated.into_iter().skip(KEEP_ROTATED_LOGS) {
        let _ = std::fs::remove_file(stale);
    }
}

/// First token of the line appended before tracing starts; a CLI
/// tailing the log looks for it to locate this startup attempt.
/// Full line: "=== ndd pid 12345 starting ==="
const STARTUP_MARKER: &str = "=== ndd pid ";

fn write_startup_marker(config: &DaemonConfig) -> std::io::Result<()> {
    append_log_line(
        config,
        &format!("{STARTUP_MARKER}{} starting ===", std::process::id()),
    )
}

fn write_startup_error(config: &DaemonConfig, error: &LifecycleError) {
    let _ = append_log_line(config, &format!("ERROR startup failed: {error}"));
}

/// Append one line straight to the daemon log, creating parents as
/// needed. The non-blocking tracing writer may not flush before a fast
/// exit; these lines bypass it.
fn append_log_line(config: &DaemonConfig, line: &str) -> std::io::Result<()> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{line}")
}

fn setup_logging(
    config: &DaemonConfig,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = config
        .log_path
        .parent()
        .unwrap_or_else(|| std::path::Path::new("."));
    std::fs::create_dir_all(log_dir)?;
    let file_name = config
        .log_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "daemon.log".to_string());

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Tee: file plus stdout.
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .with(fmt::layer())
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
