// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitored application records for the health observer.

use serde::{Deserialize, Serialize};

/// State the operator wants the workload to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    Running,
    Stopped,
    Removed,
}

/// When the monitor is allowed to restart an exited workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    Always,
    OnFailure,
    Never,
}

/// A workload the daemon keeps in a desired state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredApp {
    pub name: String,
    pub desired_state: DesiredState,
    pub restart_policy: RestartPolicy,
    /// Maximum automatic restarts; -1 means unbounded
    pub max_restarts: i64,
    pub restart_count: u32,
    /// Epoch seconds of the last monitor observation
    pub last_check: u64,
}

impl MonitoredApp {
    pub fn new(name: impl Into<String>, restart_policy: RestartPolicy, max_restarts: i64) -> Self {
        Self {
            name: name.into(),
            desired_state: DesiredState::Running,
            restart_policy,
            max_restarts,
            restart_count: 0,
            last_check: 0,
        }
    }

    /// Whether policy still permits an automatic restart.
    pub fn may_restart(&self) -> bool {
        match self.restart_policy {
            RestartPolicy::Never => false,
            RestartPolicy::Always | RestartPolicy::OnFailure => {
                self.max_restarts < 0 || i64::from(self.restart_count) < self.max_restarts
            }
        }
    }
}

#[cfg(test)]
#[path = "monitored_tests.rs"]
mod tests;
