// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use fs2::FileExt;
use nd_adapters::{CaddyAdapter, DockerAdapter, SystemdAdapter, TcpProbe};
use nd_core::{DaemonConfig, SystemClock};
use nd_engine::{HealthMonitor, ShipEngine, SwitchConfig, SwitchEngine};
use nd_storage::{ReleaseStore, StoreError};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::info;

use crate::listener::ListenCtx;
use crate::ratelimit::TokenBucket;

/// Daemon context with concrete adapter types
pub(crate) type DaemonCtx =
    ListenCtx<DockerAdapter, SystemdAdapter, CaddyAdapter, TcpProbe, SystemClock>;

/// Grace window for in-flight handlers during shutdown.
pub(crate) const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of daemon startup.
///
/// The socket is returned separately so main can wrap it in a Listener
/// task; the lock file must stay alive for the daemon's lifetime.
pub(crate) struct StartupResult {
    pub ctx: Arc<DaemonCtx>,
    pub socket: UnixListener,
    // NOTE(lifetime): held to maintain the exclusive PID lock; released on drop
    #[allow(dead_code)]
    pub lock_file: File,
}

impl std::fmt::Debug for StartupResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartupResult").finish_non_exhaustive()
    }
}

/// Start the daemon: directories, PID lock, socket, adapters, engines.
pub(crate) fn startup(config: &DaemonConfig) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config) {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock —
            // those files belong to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup(config);
            }
            Err(e)
        }
    }
}

fn startup_inner(config: &DaemonConfig) -> Result<StartupResult, LifecycleError> {
    // 1. Create directories. The socket's containing directory is the
    // access boundary together with the socket mode.
    std::fs::create_dir_all(&config.state_dir)?;
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
        std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
    }
    if let Some(parent) = config.lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&config.apps_root)?;

    // 2. Acquire the lock file FIRST - prevents races. Avoid truncating
    // before the lock is held, which would wipe the running daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Remove a stale socket and bind, then clamp the socket mode.
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let socket = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;
    std::fs::set_permissions(
        &config.socket_path,
        std::fs::Permissions::from_mode(config.socket_mode),
    )?;

    // 4. Reconcile release pointers: an app whose `current` symlink is
    // missing (operators delete links) is repaired from its newest release.
    reconcile_current_links(config);

    // 5. Adapters and engines.
    let runtime = DockerAdapter::new(&config.docker_bin);
    let services = SystemdAdapter::new(&config.systemd_unit_dir);
    let proxy = CaddyAdapter::new(&config.caddy_sites_dir, &config.caddy_main_config);
    let probe = TcpProbe::new();
    let clock = SystemClock;

    let switch_config = SwitchConfig {
        blue_port: config.blue_port,
        green_port: config.green_port,
        ..Default::default()
    };
    let ctx = Arc::new(ListenCtx {
        switcher: SwitchEngine::new(
            runtime.clone(),
            proxy.clone(),
            probe.clone(),
            clock.clone(),
            switch_config,
        ),
        shipper: ShipEngine::new(
            config.apps_root.clone(),
            services.clone(),
            proxy.clone(),
            clock.clone(),
        ),
        monitor: HealthMonitor::new(
            runtime.clone(),
            probe.clone(),
            clock.clone(),
            Duration::from_secs(config.monitor_tick_secs),
        ),
        runtime,
        proxy,
        limiter: Mutex::new(TokenBucket::default()),
        shutdown: Arc::new(Notify::new()),
        restart_requested: AtomicBool::new(false),
        config: config.clone(),
    });

    info!("daemon started");
    Ok(StartupResult {
        ctx,
        socket,
        lock_file,
    })
}

/// Repoint missing `current` symlinks at each app's newest release.
fn reconcile_current_links(config: &DaemonConfig) {
    let store = ReleaseStore::new(&config.apps_root);
    let Ok(entries) = std::fs::read_dir(&config.apps_root) else {
        return;
    };
    for entry in entries.filter_map(Result::ok) {
        let app = entry.file_name().to_string_lossy().into_owned();
        if !entry.path().is_dir() || app.starts_with('.') {
            continue;
        }
        match store.repair_current(&app) {
            Ok(Some(target)) => {
                info!(app = %app, target = %target.display(), "repaired current pointer")
            }
            // Intact link, or a directory that never held a release.
            Ok(None) | Err(StoreError::NoReleases(_)) => {}
            Err(e) => tracing::warn!(app = %app, error = %e, "failed to repair current pointer"),
        }
    }
}

/// Remove the socket and PID files. Used for both graceful shutdown and
/// failed-startup cleanup.
pub(crate) fn cleanup(config: &DaemonConfig) {
    if config.socket_path.exists() {
        if let Err(e) = std::fs::remove_file(&config.socket_path) {
            tracing::warn!("failed to remove socket file: {}", e);
        }
    }
    if config.lock_path.exists() {
        if let Err(e) = std::fs::remove_file(&config.lock_path) {
            tracing::warn!("failed to remove PID file: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "../lifecycle_tests.rs"]
mod tests;
