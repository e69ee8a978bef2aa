// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: JSON file over path defaults.
//!
//! Paths default under `/var` + `/etc` when the daemon runs as root, and
//! under `$HOME/.nextdeploy` otherwise. A config file may override any
//! subset of fields; missing fields keep their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the daemon, used to derive default paths.
pub const DAEMON_NAME: &str = "nextdeploy";

/// Default file mode for the control socket (owner + group read/write).
pub const DEFAULT_SOCKET_MODE: u32 = 0o660;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("could not determine home directory")]
    NoHomeDir,
}

/// Process-wide daemon configuration, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Root state directory
    pub state_dir: PathBuf,
    /// Path to the control Unix socket
    pub socket_path: PathBuf,
    /// File mode applied to the control socket
    pub socket_mode: u32,
    /// Path to the lock/PID file
    pub lock_path: PathBuf,
    /// Path to the daemon log file
    pub log_path: PathBuf,
    /// Root directory for per-app releases
    pub apps_root: PathBuf,
    /// Name prefix distinguishing managed containers
    pub container_prefix: String,
    /// Container runtime binary
    pub docker_bin: String,
    /// Directory for generated systemd units
    pub systemd_unit_dir: PathBuf,
    /// Daemon-owned Caddy include directory
    pub caddy_sites_dir: PathBuf,
    /// Main Caddy config file (import directive target)
    pub caddy_main_config: PathBuf,
    /// Blue/green alternate ports
    pub blue_port: u16,
    pub green_port: u16,
    /// Health monitor tick interval in seconds
    pub monitor_tick_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        if running_as_root() {
            Self::system_defaults()
        } else {
            match dirs::home_dir() {
                Some(home) => Self::user_defaults(&home),
                // No home dir to fall back to; use the system layout and
                // let startup surface the permission error.
                None => Self::system_defaults(),
            }
        }
    }
}

impl DaemonConfig {
    /// Defaults for a root-owned daemon (`/var` + `/etc`).
    pub fn system_defaults() -> Self {
        let state_dir = PathBuf::from("/var/lib").join(DAEMON_NAME);
        Self {
            socket_path: PathBuf::from("/var/run").join(format!("{DAEMON_NAME}.sock")),
            socket_mode: DEFAULT_SOCKET_MODE,
            lock_path: PathBuf::from("/var/run").join(format!("{DAEMON_NAME}.pid")),
            log_path: PathBuf::from("/var/log")
                .join(DAEMON_NAME)
                .join("daemon.log"),
            apps_root: state_dir.join("apps"),
            container_prefix: format!("{DAEMON_NAME}-"),
            docker_bin: "docker".to_string(),
            systemd_unit_dir: PathBuf::from("/etc/systemd/system"),
            caddy_sites_dir: PathBuf::from("/etc/caddy").join(format!("{DAEMON_NAME}.d")),
            caddy_main_config: PathBuf::from("/etc/caddy/Caddyfile"),
            blue_port: 3001,
            green_port: 3002,
            monitor_tick_secs: 30,
            state_dir,
        }
    }

    /// Defaults for an unprivileged daemon under `$HOME/.nextdeploy`.
    pub fn user_defaults(home: &Path) -> Self {
        Self::rooted_at(home.join(format!(".{DAEMON_NAME}")))
    }

    /// Defaults with every path under one state directory.
    pub fn rooted_at(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        Self {
            socket_path: state_dir.join("daemon.sock"),
            socket_mode: DEFAULT_SOCKET_MODE,
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            apps_root: state_dir.join("apps"),
            container_prefix: format!("{DAEMON_NAME}-"),
            docker_bin: "docker".to_string(),
            systemd_unit_dir: state_dir.join("systemd"),
            caddy_sites_dir: state_dir.join("caddy.d"),
            caddy_main_config: state_dir.join("Caddyfile"),
            blue_port: 3001,
            green_port: 3002,
            monitor_tick_secs: 30,
            state_dir,
        }
    }

    /// Load configuration.
    ///
    /// With an explicit path the file must exist. Without one, the default
    /// config path is read when present, and defaults are used otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Self::from_file(path)
            }
            None => {
                let path = Self::default_config_path()?;
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse a config file, overlaying the path defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Default location of the config file for this user.
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        if running_as_root() {
            Ok(PathBuf::from("/etc")
                .join(DAEMON_NAME)
                .join("config.json"))
        } else {
            let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
            Ok(home.join(format!(".{DAEMON_NAME}")).join("config.json"))
        }
    }
}

/// Whether the process runs with euid 0.
///
/// Read from `/proc/self/status` (the daemon targets Linux servers); any
/// read or parse failure falls back to the unprivileged layout.
fn running_as_root() -> bool {
    let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
        return false;
    };
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("Uid:") {
            // Uid: <real> <effective> <saved> <fs>
            let mut fields = rest.split_whitespace();
            let _real = fields.next();
            return fields.next() == Some("0");
        }
    }
    false
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
