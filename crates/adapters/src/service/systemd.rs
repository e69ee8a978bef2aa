// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Systemd service manager adapter

use super::{ServiceError, ServiceManager};
use crate::subprocess::{run_with_timeout, SYSTEMCTL_TIMEOUT};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

/// Systemd-backed service manager driving `systemctl`.
#[derive(Clone)]
pub struct SystemdAdapter {
    unit_dir: PathBuf,
}

impl SystemdAdapter {
    pub fn new(unit_dir: impl Into<PathBuf>) -> Self {
        Self {
            unit_dir: unit_dir.into(),
        }
    }

    pub fn unit_path(&self, unit: &str) -> PathBuf {
        self.unit_dir.join(unit)
    }

    async fn systemctl(&self, args: &[&str]) -> Result<std::process::Output, ServiceError> {
        let mut cmd = Command::new("systemctl");
        cmd.args(args);
        run_with_timeout(cmd, SYSTEMCTL_TIMEOUT, "systemctl")
            .await
            .map_err(ServiceError::CommandFailed)
    }

    async fn daemon_reload(&self) -> Result<(), ServiceError> {
        let output = self.systemctl(&["daemon-reload"]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ServiceError::CommandFailed(format!(
                "systemctl daemon-reload: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Whether systemctl stderr indicates the unit simply does not exist.
fn unit_missing(stderr: &str) -> bool {
    stderr.contains("not loaded") || stderr.contains("could not be found")
}

#[async_trait]
impl ServiceManager for SystemdAdapter {
    async fn install_unit(&self, unit: &str, contents: &str) -> Result<(), ServiceError> {
        if let Some(parent) = self.unit_path(unit).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ServiceError::WriteUnit(unit.to_string(), e))?;
        }
        std::fs::write(self.unit_path(unit), contents)
            .map_err(|e| ServiceError::WriteUnit(unit.to_string(), e))?;
        self.daemon_reload().await?;

        // Boot persistence; a failed enable does not block the deploy.
        let output = self.systemctl(&["enable", unit]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(unit, stderr = %stderr.trim(), "systemctl enable failed");
        }
        Ok(())
    }

    async fn start(&self, unit: &str) -> Result<(), ServiceError> {
        let output = self.systemctl(&["start", unit]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ServiceError::StartFailed {
                unit: unit.to_string(),
                message: stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    async fn stop(&self, unit: &str) -> Result<(), ServiceError> {
        let output = self.systemctl(&["stop", unit]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if unit_missing(&stderr) {
                tracing::info!(unit, "stop of nonexistent unit ignored");
                return Ok(());
            }
            return Err(ServiceError::CommandFailed(format!(
                "systemctl stop {unit}: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }

    async fn restart(&self, unit: &str) -> Result<(), ServiceError> {
        let output = self.systemctl(&["restart", unit]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ServiceError::StartFailed {
                unit: unit.to_string(),
                message: stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    async fn remove(&self, unit: &str) -> Result<(), ServiceError> {
        self.stop(unit).await?;

        let output = self.systemctl(&["disable", unit]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !unit_missing(&stderr) {
                tracing::warn!(unit, stderr = %stderr.trim(), "systemctl disable failed");
            }
        }

        let path = self.unit_path(unit);
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| ServiceError::WriteUnit(unit.to_string(), e))?;
        }
        self.daemon_reload().await
    }

    async fn is_active(&self, unit: &str) -> Result<bool, ServiceError> {
        let output = self.systemctl(&["is-active", "--quiet", unit]).await?;
        Ok(output.status.success())
    }
}

#[cfg(test)]
#[path = "systemd_tests.rs"]
mod tests;
