// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background health monitor.
//!
//! One periodic loop reconciles observed workload state against the
//! desired state of every registered app. Handlers register and
//! deregister apps through a shared handle; the monitor is the sole
//! owner of the records.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use nd_adapters::{first_published_port, ContainerRuntime, HealthProbe, RuntimeError};
use nd_core::{Clock, DesiredState, MonitoredApp};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Health monitor over the container runtime.
#[derive(Clone)]
pub struct HealthMonitor<R, H, C> {
    apps: Arc<Mutex<HashMap<String, MonitoredApp>>>,
    runtime: R,
    probe: H,
    clock: C,
    tick: Duration,
}

impl<R, H, C> HealthMonitor<R, H, C>
where
    R: ContainerRuntime,
    H: HealthProbe,
    C: Clock,
{
    pub fn new(runtime: R, probe: H, clock: C, tick: Duration) -> Self {
        Self {
            apps: Arc::new(Mutex::new(HashMap::new())),
            runtime,
            probe,
            clock,
            tick,
        }
    }

    /// Register (or replace) a monitored app.
    pub fn register(&self, app: MonitoredApp) {
        info!(app = %app.name, "registering monitored app");
        self.apps.lock().insert(app.name.clone(), app);
    }

    /// Remove an app from monitoring. Returns whether it was present.
    pub fn deregister(&self, name: &str) -> bool {
        let removed = self.apps.lock().remove(name).is_some();
        if removed {
            info!(app = name, "deregistered monitored app");
        }
        removed
    }

    /// Update the desired state for an app. Returns whether it exists.
    pub fn set_desired(&self, name: &str, state: DesiredState) -> bool {
        match self.apps.lock().get_mut(name) {
            Some(app) => {
                app.desired_state = state;
                true
            }
            None => false,
        }
    }

    /// Snapshot of all records, sorted by name.
    pub fn snapshot(&self) -> Vec<MonitoredApp> {
        let mut apps: Vec<MonitoredApp> = self.apps.lock().values().cloned().collect();
        apps.sort_by(|a, b| a.name.cmp(&b.name));
        apps
    }

    /// Run the periodic loop until cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.tick);
        // The first tick fires immediately; skip it so registration from
        // startup settles first.
        interval.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("health monitor stopping");
                    return;
                }
                _ = interval.tick() => {
                    self.tick_once().await;
                }
            }
        }
    }

    /// One reconciliation pass over all registered apps.
    pub async fn tick_once(&self) {
        let names: Vec<String> = self.apps.lock().keys().cloned().collect();
        for name in names {
            self.check_app(&name).await;
        }
    }

    async fn check_app(&self, name: &str) {
        let Some(app) = self.apps.lock().get(name).cloned() else {
            return;
        };

        let observed = match self.runtime.status(name).await {
            Ok(status) => status,
            Err(RuntimeError::NotFound(_)) => {
                if app.desired_state == DesiredState::Running {
                    warn!(app = name, "monitored app has no container");
                }
                self.touch(name);
                return;
            }
            Err(e) => {
                warn!(app = name, error = %e, "failed to observe container state");
                return;
            }
        };

        // Mid-restart containers are left alone this tick.
        if observed == "restarting" {
            self.touch(name);
            return;
        }

        if app.desired_state == DesiredState::Running {
            match observed.as_str() {
                "exited" | "dead" => {
                    if app.may_restart() {
                        self.restart_app(name, &observed).await;
                    } else {
                        debug!(app = name, observed = %observed, "restart not permitted by policy");
                    }
                }
                "running" => {
                    if !self.is_live(name).await {
                        warn!(app = name, "liveness check failed");
                        if app.may_restart() {
                            self.restart_app(name, "unhealthy").await;
                        }
                    }
                }
                other => {
                    debug!(app = name, observed = other, "no action for observed state");
                }
            }
        }

        self.touch(name);
    }

    /// Application-level liveness: prefer the runtime's built-in health
    /// status; fall back to a TCP probe of the first published port. No
    /// declared check and no port means healthy.
    async fn is_live(&self, name: &str) -> bool {
        match self.runtime.health(name).await {
            Ok(health) if health.status != "none" => health.healthy,
            Ok(_) => match self.published_port(name).await {
                Some(port) => self.probe.check(port).await,
                None => true,
            },
            Err(e) => {
                warn!(app = name, error = %e, "health inspection failed");
                true
            }
        }
    }

    async fn published_port(&self, name: &str) -> Option<u16> {
        self.runtime
            .list(true)
            .await
            .ok()?
            .into_iter()
            .find(|c| c.name == name)
            .as_ref()
            .and_then(first_published_port)
    }

    async fn restart_app(&self, name: &str, reason: &str) {
        info!(app = name, reason, "restarting monitored app");
        // Best-effort stop; a dead container may reject it.
        if let Err(e) = self.runtime.stop(name).await {
            debug!(app = name, error = %e, "pre-restart stop failed");
        }
        match self.runtime.start(name).await {
            Ok(()) => {
                if let Some(app) = self.apps.lock().get_mut(name) {
                    app.restart_count += 1;
                }
            }
            Err(e) => warn!(app = name, error = %e, "restart failed"),
        }
    }

    fn touch(&self, name: &str) {
        if let Some(app) = self.apps.lock().get_mut(name) {
            app.last_check = self.clock.epoch_secs();
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
