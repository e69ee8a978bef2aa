// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traffic switching between workload versions.
//!
//! Four protocols: the standard stop-and-replace under the same name, the
//! blue/green health-gated cutover, the operator-initiated rename swap,
//! and rollback. Rename ordering matters throughout because the runtime
//! rejects a rename onto a name that is still held.

use std::time::Duration;

use nd_adapters::{
    first_published_port, ContainerRuntime, ContainerSummary, HealthProbe, ProxyManager, RunSpec,
    RuntimeError,
};
use nd_core::Clock;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::site_config;

/// Container-internal port apps listen on.
const CONTAINER_PORT: u16 = 3000;

/// Tunables for the switch protocols.
#[derive(Debug, Clone)]
pub struct SwitchConfig {
    pub blue_port: u16,
    pub green_port: u16,
    /// Attempts against the new container before declaring it unhealthy
    pub health_retries: u32,
    /// Delay before the first attempt and between attempts
    pub health_delay: Duration,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            blue_port: 3001,
            green_port: 3002,
            health_retries: 5,
            health_delay: Duration::from_secs(2),
        }
    }
}

/// Derive a container base name from an image reference
/// (`registry.io/team/web:v2` becomes `web`).
pub fn container_base_name(image: &str) -> String {
    let after_slash = image.rsplit('/').next().unwrap_or(image);
    after_slash
        .split(':')
        .next()
        .unwrap_or(after_slash)
        .to_string()
}

/// Traffic-switch engine over injected adapters.
#[derive(Clone)]
pub struct SwitchEngine<R, P, H, C> {
    runtime: R,
    proxy: P,
    probe: H,
    clock: C,
    config: SwitchConfig,
}

impl<R, P, H, C> SwitchEngine<R, P, H, C>
where
    R: ContainerRuntime,
    P: ProxyManager,
    H: HealthProbe,
    C: Clock,
{
    pub fn new(runtime: R, proxy: P, probe: H, clock: C, config: SwitchConfig) -> Self {
        Self {
            runtime,
            proxy,
            probe,
            clock,
            config,
        }
    }

    async fn require_image(&self, image: &str) -> Result<(), EngineError> {
        if !self.runtime.image_exists(image).await? {
            return Err(EngineError::Validation(format!(
                "image not available locally: {image} (pull it first)"
            )));
        }
        Ok(())
    }

    async fn find_container(&self, name: &str) -> Result<Option<ContainerSummary>, EngineError> {
        Ok(self
            .runtime
            .list(true)
            .await?
            .into_iter()
            .find(|c| c.name == name))
    }

    /// Standard switch: stop the old workload, run the new image under the
    /// same name. The old container survives as `<name>-previous` so a
    /// failed run can be undone and `rollback` keeps working.
    pub async fn standard_switch(
        &self,
        current: &str,
        image: &str,
        new_app: bool,
    ) -> Result<(), EngineError> {
        self.require_image(image).await?;

        let previous = format!("{current}-previous");
        let existing = self.find_container(current).await?;
        if existing.is_none() && !new_app {
            return Err(EngineError::Validation(format!(
                "container not found: {current} (use the new-app flag for a first deploy)"
            )));
        }

        let ports = match &existing {
            Some(summary) => host_port_mappings(summary),
            None => vec![format!("{CONTAINER_PORT}:{CONTAINER_PORT}")],
        };

        if let Some(summary) = &existing {
            if summary.status.starts_with("Up") || summary.status == "running" {
                self.runtime.stop(current).await?;
            }
            // Clear any stale -previous from an earlier switch, then move
            // the old container out of the way so the name is free.
            if self.find_container(&previous).await?.is_some() {
                self.runtime.remove(&previous, true).await?;
            }
            self.runtime.rename(current, &previous).await?;
        }

        let spec = RunSpec {
            image: image.to_string(),
            name: current.to_string(),
            ports,
            ..Default::default()
        };
        if let Err(run_err) = self.runtime.run(&spec).await {
            warn!(container = current, error = %run_err, "new container failed to start, restoring old one");
            if existing.is_some() {
                if let Err(e) = self.runtime.rename(&previous, current).await {
                    warn!(error = %e, "failed to rename old container back");
                } else if let Err(e) = self.runtime.start(current).await {
                    warn!(error = %e, "failed to restart old container");
                }
            }
            return Err(EngineError::Validation(format!(
                "failed to run new container from {image}: {run_err}"
            )));
        }

        info!(container = current, image, "standard switch complete");
        Ok(())
    }

    /// Blue/green switch: run the new image beside the old one on the
    /// alternate port, gate on health, then move the proxy and demote the
    /// old container to `<name>-previous`.
    ///
    /// Returns the name of the new container.
    pub async fn blue_green_switch(
        &self,
        current: &str,
        image: &str,
        domain: &str,
        new_app: bool,
    ) -> Result<String, EngineError> {
        self.require_image(image).await?;

        let existing = self.find_container(current).await?;
        if existing.is_none() && !new_app {
            return Err(EngineError::Validation(format!(
                "container not found: {current} (use the new-app flag for a first deploy)"
            )));
        }

        // Pick whichever of the two ports the live container is not using.
        let in_use = existing.as_ref().and_then(first_published_port);
        let alt_port = if in_use == Some(self.config.blue_port) {
            self.config.green_port
        } else {
            self.config.blue_port
        };

        let new_name = format!(
            "{}-bluegreen-{}",
            container_base_name(image),
            self.clock.epoch_secs()
        );
        let spec = RunSpec {
            image: image.to_string(),
            name: new_name.clone(),
            ports: vec![format!("{alt_port}:{CONTAINER_PORT}")],
            ..Default::default()
        };
        self.runtime.run(&spec).await?;

        if !self.await_health(alt_port).await {
            // Unhealthy: remove the candidate, never touch traffic.
            if let Err(e) = self.runtime.remove(&new_name, true).await {
                warn!(container = %new_name, error = %e, "failed to remove unhealthy candidate");
            }
            return Err(EngineError::HealthGate {
                name: new_name,
                port: alt_port,
            });
        }

        // Healthy: cut traffic over, then demote the old container.
        self.proxy
            .install_site(current, &site_config::proxy_site(domain, alt_port))
            .await?;
        self.proxy.reload().await?;

        if existing.is_some() {
            let previous = format!("{current}-previous");
            self.runtime.stop(current).await?;
            if self.find_container(&previous).await?.is_some() {
                self.runtime.remove(&previous, true).await?;
            }
            self.runtime.rename(current, &previous).await?;
        }

        info!(container = %new_name, image, port = alt_port, "blue/green switch complete");
        Ok(new_name)
    }

    async fn await_health(&self, port: u16) -> bool {
        for _ in 0..self.config.health_retries {
            tokio::time::sleep(self.config.health_delay).await;
            if self.probe.check(port).await {
                return true;
            }
        }
        false
    }

    /// Swap the identities of two containers, preserving which of them
    /// were running. The temp name breaks the rename cycle.
    pub async fn swap(&self, a: &str, b: &str) -> Result<(), EngineError> {
        let status_a = self.runtime.status(a).await?;
        let status_b = self.runtime.status(b).await?;

        self.runtime.stop(a).await?;
        self.runtime.stop(b).await?;

        let temp = format!("{a}-temp-{}", self.clock.epoch_secs());
        self.runtime.rename(a, &temp).await?;
        self.runtime.rename(b, a).await?;
        self.runtime.rename(&temp, b).await?;

        // Restore run state: the container originally called A is now B.
        if status_a == "running" {
            self.runtime.start(b).await?;
        }
        if status_b == "running" {
            self.runtime.start(a).await?;
        }

        info!(from = a, to = b, "container swap complete");
        Ok(())
    }

    /// Roll back to `<name>-previous`. The replaced container stays as
    /// `<name>-backup-<ts>` even when a later step fails, so the state
    /// can be inspected.
    ///
    /// Returns the backup name.
    pub async fn rollback(&self, name: &str) -> Result<String, EngineError> {
        let previous = format!("{name}-previous");
        match self.runtime.status(&previous).await {
            Ok(_) => {}
            Err(RuntimeError::NotFound(_)) => {
                return Err(EngineError::Validation(format!(
                    "nothing to roll back to: container {previous} does not exist"
                )));
            }
            Err(e) => return Err(e.into()),
        }

        self.runtime.stop(name).await?;
        let backup = format!("{name}-backup-{}", self.clock.epoch_secs());
        self.runtime.rename(name, &backup).await?;
        self.runtime.rename(&previous, name).await?;
        self.runtime.start(name).await?;

        info!(container = name, backup = %backup, "rollback complete");
        Ok(backup)
    }
}

/// Recover `host:container` mappings from a list row
/// (`0.0.0.0:3001->3000/tcp` becomes `3001:3000`).
fn host_port_mappings(summary: &ContainerSummary) -> Vec<String> {
    summary
        .ports
        .iter()
        .filter_map(|mapping| {
            let (host_side, rest) = mapping.split_once("->")?;
            let host_port = host_side.rsplit(':').next()?;
            let container_port = rest.split('/').next()?;
            // v6 duplicates collapse onto the same mapping
            host_port
                .parse::<u16>()
                .ok()
                .map(|hp| format!("{hp}:{container_port}"))
        })
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
#[path = "switch_tests.rs"]
mod tests;
