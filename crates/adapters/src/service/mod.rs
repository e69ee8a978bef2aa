// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host service manager adapters

mod systemd;

pub use systemd::SystemdAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeServiceManager, ServiceCall};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from service manager operations
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to write unit {0}: {1}")]
    WriteUnit(String, std::io::Error),
    #[error("failed to start {unit}: {message}")]
    StartFailed { unit: String, message: String },
    #[error("service command failed: {0}")]
    CommandFailed(String),
}

/// Adapter for supervised host services (systemd units).
#[async_trait]
pub trait ServiceManager: Clone + Send + Sync + 'static {
    /// Write (or overwrite) a unit file and reload the supervisor
    async fn install_unit(&self, unit: &str, contents: &str) -> Result<(), ServiceError>;

    /// Start a unit; failures are fatal to the enclosing deploy
    async fn start(&self, unit: &str) -> Result<(), ServiceError>;

    /// Stop a unit; a nonexistent unit is logged and ignored
    async fn stop(&self, unit: &str) -> Result<(), ServiceError>;

    /// Restart a unit
    async fn restart(&self, unit: &str) -> Result<(), ServiceError>;

    /// Stop, disable, and delete a unit, then reload the supervisor
    async fn remove(&self, unit: &str) -> Result<(), ServiceError>;

    /// Whether the unit is currently active
    async fn is_active(&self, unit: &str) -> Result<bool, ServiceError>;
}
