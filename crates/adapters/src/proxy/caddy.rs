// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caddy proxy adapter: per-app config fragments + graceful reload.

use super::{ProxyError, ProxyManager};
use crate::subprocess::{run_with_timeout, CADDY_TIMEOUT, SYSTEMCTL_TIMEOUT};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

/// Caddy-based proxy manager.
#[derive(Clone)]
pub struct CaddyAdapter {
    sites_dir: PathBuf,
    main_config: PathBuf,
}

impl CaddyAdapter {
    pub fn new(sites_dir: impl Into<PathBuf>, main_config: impl Into<PathBuf>) -> Self {
        Self {
            sites_dir: sites_dir.into(),
            main_config: main_config.into(),
        }
    }

    pub fn site_path(&self, app: &str) -> PathBuf {
        self.sites_dir.join(format!("{app}.conf"))
    }

    fn import_directive(&self) -> String {
        format!("import {}/*.conf", self.sites_dir.display())
    }
}

#[async_trait]
impl ProxyManager for CaddyAdapter {
    async fn install_site(&self, app: &str, contents: &str) -> Result<(), ProxyError> {
        std::fs::create_dir_all(&self.sites_dir)
            .map_err(|e| ProxyError::WriteConfig(self.sites_dir.display().to_string(), e))?;
        let path = self.site_path(app);
        std::fs::write(&path, contents)
            .map_err(|e| ProxyError::WriteConfig(path.display().to_string(), e))?;
        Ok(())
    }

    async fn remove_site(&self, app: &str) -> Result<(), ProxyError> {
        let path = self.site_path(app);
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| ProxyError::WriteConfig(path.display().to_string(), e))?;
        }
        Ok(())
    }

    async fn ensure_import(&self) -> Result<bool, ProxyError> {
        let main = &self.main_config;
        if let Some(parent) = main.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ProxyError::WriteConfig(parent.display().to_string(), e))?;
        }

        let existing = match std::fs::read_to_string(main) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(ProxyError::WriteConfig(main.display().to_string(), e)),
        };

        let directive = self.import_directive();
        if existing.lines().any(|line| line.trim() == directive) {
            return Ok(false);
        }

        let mut updated = existing;
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push('\n');
        }
        updated.push_str(&directive);
        updated.push('\n');
        std::fs::write(main, updated)
            .map_err(|e| ProxyError::WriteConfig(main.display().to_string(), e))?;
        Ok(true)
    }

    async fn reload(&self) -> Result<(), ProxyError> {
        let mut cmd = Command::new("caddy");
        cmd.args(["reload", "--config"]).arg(&self.main_config);
        let reload = run_with_timeout(cmd, CADDY_TIMEOUT, "caddy reload")
            .await
            .map_err(ProxyError::Reload)?;
        if reload.status.success() {
            return Ok(());
        }
        let reload_stderr = String::from_utf8_lossy(&reload.stderr).trim().to_string();
        tracing::warn!(stderr = %reload_stderr, "caddy reload failed, falling back to restart");

        let mut restart = Command::new("systemctl");
        restart.args(["restart", "caddy"]);
        let output = run_with_timeout(restart, SYSTEMCTL_TIMEOUT, "systemctl restart caddy")
            .await
            .map_err(ProxyError::Reload)?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(ProxyError::Reload(format!(
                "reload: {reload_stderr}; restart: {stderr}"
            )))
        }
    }
}

#[cfg(test)]
#[path = "caddy_tests.rs"]
mod tests;
