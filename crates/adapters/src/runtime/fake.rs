// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake container runtime for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ContainerRuntime, ContainerSummary, HealthStatus, RunSpec, RuntimeError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Recorded runtime call
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeCall {
    List { all: bool },
    Inspect { name: String },
    Status { name: String },
    ImageExists { image: String },
    Pull { image: String },
    Run { spec: RunSpec },
    Start { name: String },
    Stop { name: String },
    Restart { name: String },
    Rename { old: String, new: String },
    Remove { name: String, force: bool },
    Logs { name: String, tail: u32 },
    Health { name: String },
}

/// Fake container state
#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub image: String,
    pub status: String,
    pub ports: Vec<String>,
    pub created: String,
    /// Built-in health status; `none` means no declared health check
    pub health: String,
    pub logs: String,
}

impl FakeContainer {
    fn new(image: &str, status: &str) -> Self {
        Self {
            image: image.to_string(),
            status: status.to_string(),
            ports: Vec::new(),
            created: "2026-01-01 00:00:00".to_string(),
            health: "none".to_string(),
            logs: String::new(),
        }
    }
}

struct FakeRuntimeState {
    containers: HashMap<String, FakeContainer>,
    images: HashSet<String>,
    calls: Vec<RuntimeCall>,
    fail_run_images: HashSet<String>,
    fail_start: HashSet<String>,
}

/// Fake container runtime for testing
#[derive(Clone)]
pub struct FakeRuntime {
    inner: Arc<Mutex<FakeRuntimeState>>,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeRuntimeState {
                containers: HashMap::new(),
                images: HashSet::new(),
                calls: Vec::new(),
                fail_run_images: HashSet::new(),
                fail_start: HashSet::new(),
            })),
        }
    }
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.inner.lock().calls.clone()
    }

    /// Get a container by name
    pub fn container(&self, name: &str) -> Option<FakeContainer> {
        self.inner.lock().containers.get(name).cloned()
    }

    /// Sorted container names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.lock().containers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Add a pre-existing container
    pub fn add_container(&self, name: &str, image: &str, status: &str) {
        self.inner
            .lock()
            .containers
            .insert(name.to_string(), FakeContainer::new(image, status));
    }

    /// Add a locally-available image
    pub fn add_image(&self, image: &str) {
        self.inner.lock().images.insert(image.to_string());
    }

    /// Set a container's built-in health status
    pub fn set_health(&self, name: &str, health: &str) {
        if let Some(container) = self.inner.lock().containers.get_mut(name) {
            container.health = health.to_string();
        }
    }

    /// Set a container's published ports
    pub fn set_ports(&self, name: &str, ports: Vec<String>) {
        if let Some(container) = self.inner.lock().containers.get_mut(name) {
            container.ports = ports;
        }
    }

    /// Set a container's status directly (e.g. `dead`, `restarting`)
    pub fn set_status(&self, name: &str, status: &str) {
        if let Some(container) = self.inner.lock().containers.get_mut(name) {
            container.status = status.to_string();
        }
    }

    /// Set a container's log text
    pub fn set_logs(&self, name: &str, logs: &str) {
        if let Some(container) = self.inner.lock().containers.get_mut(name) {
            container.logs = logs.to_string();
        }
    }

    /// Make `run` fail for containers of this image
    pub fn fail_runs_of(&self, image: &str) {
        self.inner.lock().fail_run_images.insert(image.to_string());
    }

    /// Make `start` fail for this container
    pub fn fail_start_of(&self, name: &str) {
        self.inner.lock().fail_start.insert(name.to_string());
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list(&self, all: bool) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::List { all });

        let mut rows: Vec<ContainerSummary> = inner
            .containers
            .iter()
            .filter(|(_, c)| all || c.status == "running")
            .map(|(name, c)| ContainerSummary {
                id: format!("id-{name}"),
                name: name.clone(),
                image: c.image.clone(),
                status: c.status.clone(),
                ports: c.ports.clone(),
                created: c.created.clone(),
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn inspect(&self, name: &str) -> Result<serde_json::Value, RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::Inspect {
            name: name.to_string(),
        });

        match inner.containers.get(name) {
            Some(c) => Ok(serde_json::json!({
                "Name": name,
                "Image": c.image,
                "State": { "Status": c.status },
            })),
            None => Err(RuntimeError::NotFound(name.to_string())),
        }
    }

    async fn status(&self, name: &str) -> Result<String, RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::Status {
            name: name.to_string(),
        });

        inner
            .containers
            .get(name)
            .map(|c| c.status.clone())
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))
    }

    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::ImageExists {
            image: image.to_string(),
        });
        Ok(inner.images.contains(image))
    }

    async fn pull(&self, image: &str) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::Pull {
            image: image.to_string(),
        });
        inner.images.insert(image.to_string());
        Ok(())
    }

    async fn run(&self, spec: &RunSpec) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::Run { spec: spec.clone() });

        if inner.fail_run_images.contains(&spec.image) {
            return Err(RuntimeError::CommandFailed(format!(
                "simulated run failure for image {}",
                spec.image
            )));
        }
        if inner.containers.contains_key(&spec.name) {
            return Err(RuntimeError::NameInUse(spec.name.clone()));
        }

        let mut container = FakeContainer::new(&spec.image, "running");
        container.ports = spec.ports.clone();
        inner.containers.insert(spec.name.clone(), container);
        Ok(())
    }

    async fn start(&self, name: &str) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::Start {
            name: name.to_string(),
        });

        if inner.fail_start.contains(name) {
            return Err(RuntimeError::CommandFailed(format!(
                "simulated start failure for {name}"
            )));
        }
        match inner.containers.get_mut(name) {
            Some(container) => {
                container.status = "running".to_string();
                Ok(())
            }
            None => Err(RuntimeError::NotFound(name.to_string())),
        }
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::Stop {
            name: name.to_string(),
        });

        match inner.containers.get_mut(name) {
            Some(container) => {
                container.status = "exited".to_string();
                Ok(())
            }
            None => Err(RuntimeError::NotFound(name.to_string())),
        }
    }

    async fn restart(&self, name: &str) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::Restart {
            name: name.to_string(),
        });

        match inner.containers.get_mut(name) {
            Some(container) => {
                container.status = "running".to_string();
                Ok(())
            }
            None => Err(RuntimeError::NotFound(name.to_string())),
        }
    }

    async fn rename(&self, old: &str, new: &str) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::Rename {
            old: old.to_string(),
            new: new.to_string(),
        });

        // Same semantics as docker: rename onto a held name is rejected.
        if inner.containers.contains_key(new) {
            return Err(RuntimeError::NameInUse(new.to_string()));
        }
        match inner.containers.remove(old) {
            Some(container) => {
                inner.containers.insert(new.to_string(), container);
                Ok(())
            }
            None => Err(RuntimeError::NotFound(old.to_string())),
        }
    }

    async fn remove(&self, name: &str, force: bool) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::Remove {
            name: name.to_string(),
            force,
        });

        let Some(container) = inner.containers.get(name) else {
            return Err(RuntimeError::NotFound(name.to_string()));
        };
        if container.status == "running" && !force {
            return Err(RuntimeError::CommandFailed(format!(
                "cannot remove running container {name}"
            )));
        }
        inner.containers.remove(name);
        Ok(())
    }

    async fn logs(&self, name: &str, tail: u32) -> Result<String, RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::Logs {
            name: name.to_string(),
            tail,
        });

        inner
            .containers
            .get(name)
            .map(|c| c.logs.clone())
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))
    }

    async fn health(&self, name: &str) -> Result<HealthStatus, RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::Health {
            name: name.to_string(),
        });

        match inner.containers.get(name) {
            Some(c) => Ok(HealthStatus {
                healthy: c.health == "healthy" || (c.health == "none" && c.status == "running"),
                status: c.health.clone(),
            }),
            None => Err(RuntimeError::NotFound(name.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
