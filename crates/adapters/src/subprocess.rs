// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers

use std::process::Output;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Default timeout for docker verbs (ps, inspect, start, stop, rename).
pub const DOCKER_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for image pulls, which stream layers over the network.
pub const DOCKER_PULL_TIMEOUT: Duration = Duration::from_secs(600);

/// Default timeout for systemctl verbs.
pub const SYSTEMCTL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for caddy reload.
pub const CADDY_TIMEOUT: Duration = Duration::from_secs(30);

/// Run a subprocess, killing it if the deadline passes.
///
/// `description` names the collaborator in errors and log lines
/// ("docker pull", "systemctl start"). A non-zero exit is not an error
/// at this layer; callers that need one go through [`run_checked`].
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    // The child must not outlive a dropped output future.
    cmd.kill_on_drop(true);

    let started = Instant::now();
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => {
            debug!(
                command = description,
                elapsed_ms = started.elapsed().as_millis() as u64,
                exit = output.status.code(),
                "subprocess finished"
            );
            Ok(output)
        }
        Ok(Err(spawn_err)) => Err(format!("{description} failed to spawn: {spawn_err}")),
        Err(_) => {
            warn!(
                command = description,
                timeout_secs = timeout.as_secs(),
                "subprocess deadline exceeded"
            );
            Err(format!(
                "{description} did not finish within {}s",
                timeout.as_secs()
            ))
        }
    }
}

/// Run a subprocess and demand a zero exit.
///
/// Returns trimmed stdout on success; a non-zero exit becomes an error
/// carrying the captured stderr, which handlers surface to the caller.
pub async fn run_checked(
    cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<String, String> {
    let output = run_with_timeout(cmd, timeout, description).await?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(format!("{}: {}", description, stderr.trim()))
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
