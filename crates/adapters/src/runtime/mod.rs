// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container runtime adapters

mod docker;

pub use docker::DockerAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeContainer, FakeRuntime, RuntimeCall};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from container runtime operations
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("container not found: {0}")]
    NotFound(String),
    #[error("image not found: {0}")]
    ImageNotFound(String),
    #[error("container name already in use: {0}")]
    NameInUse(String),
    #[error("runtime command failed: {0}")]
    CommandFailed(String),
    #[error("unexpected runtime output: {0}")]
    InvalidOutput(String),
}

/// One row of `list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
    pub ports: Vec<String>,
    pub created: String,
}

/// Everything needed to launch a workload container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSpec {
    pub image: String,
    pub name: String,
    /// Port mappings in `host:container` form
    pub ports: Vec<String>,
    /// Environment entries in `KEY=value` form
    pub env: Vec<String>,
    /// Volume mounts in `host:container` form
    pub volumes: Vec<String>,
    /// Restart policy; `unless-stopped` when unset
    pub restart: Option<String>,
    /// Override command
    pub command: Option<String>,
}

/// Result of a container health inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub status: String,
}

/// Adapter over the workload container runtime.
#[async_trait]
pub trait ContainerRuntime: Clone + Send + Sync + 'static {
    /// List containers; `all` includes stopped ones
    async fn list(&self, all: bool) -> Result<Vec<ContainerSummary>, RuntimeError>;

    /// Raw inspect data for a container
    async fn inspect(&self, name: &str) -> Result<serde_json::Value, RuntimeError>;

    /// Runtime status string (`running`, `exited`, `restarting`, ...)
    async fn status(&self, name: &str) -> Result<String, RuntimeError>;

    /// Whether an image is available locally
    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError>;

    /// Pull an image
    async fn pull(&self, image: &str) -> Result<(), RuntimeError>;

    /// Launch a container
    async fn run(&self, spec: &RunSpec) -> Result<(), RuntimeError>;

    /// Start a stopped container
    async fn start(&self, name: &str) -> Result<(), RuntimeError>;

    /// Stop a running container
    async fn stop(&self, name: &str) -> Result<(), RuntimeError>;

    /// Restart a container
    async fn restart(&self, name: &str) -> Result<(), RuntimeError>;

    /// Rename a container; the runtime rejects renames onto a held name
    async fn rename(&self, old: &str, new: &str) -> Result<(), RuntimeError>;

    /// Remove a container
    async fn remove(&self, name: &str, force: bool) -> Result<(), RuntimeError>;

    /// Most recent log lines
    async fn logs(&self, name: &str, tail: u32) -> Result<String, RuntimeError>;

    /// Built-in health state; a container with no declared health check
    /// reports `none` and counts as healthy while running
    async fn health(&self, name: &str) -> Result<HealthStatus, RuntimeError>;
}

/// Host port of the first published mapping in a `list` row, if any.
///
/// Docker formats mappings as `0.0.0.0:3001->3000/tcp`.
pub fn first_published_port(summary: &ContainerSummary) -> Option<u16> {
    summary.ports.iter().find_map(|mapping| {
        let host_side = mapping.split("->").next()?;
        host_side.rsplit(':').next()?.parse().ok()
    })
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
