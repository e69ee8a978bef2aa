// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker CLI runtime adapter

use super::{ContainerRuntime, ContainerSummary, HealthStatus, RunSpec, RuntimeError};
use crate::subprocess::{run_checked, DOCKER_PULL_TIMEOUT, DOCKER_TIMEOUT};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

/// Docker-based container runtime adapter
#[derive(Clone)]
pub struct DockerAdapter {
    bin: String,
}

impl DockerAdapter {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.args(args);
        cmd
    }
}

/// One line of `docker ps --format '{{json .}}'`.
#[derive(Debug, Deserialize)]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "Image")]
    image: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Ports", default)]
    ports: String,
    #[serde(rename = "CreatedAt", default)]
    created_at: String,
}

impl From<PsLine> for ContainerSummary {
    fn from(line: PsLine) -> Self {
        ContainerSummary {
            id: line.id,
            name: line.names,
            image: line.image,
            status: line.status,
            ports: split_ports(&line.ports),
            created: line.created_at,
        }
    }
}

fn split_ports(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Arguments for `docker run` derived from a [`RunSpec`].
fn run_args(spec: &RunSpec) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "-d".to_string(),
        "--name".to_string(),
        spec.name.clone(),
    ];
    for port in &spec.ports {
        args.push("-p".to_string());
        args.push(port.clone());
    }
    for env in &spec.env {
        args.push("-e".to_string());
        args.push(env.clone());
    }
    for volume in &spec.volumes {
        args.push("-v".to_string());
        args.push(volume.clone());
    }
    args.push("--restart".to_string());
    args.push(
        spec.restart
            .clone()
            .unwrap_or_else(|| "unless-stopped".to_string()),
    );
    args.push(spec.image.clone());
    if let Some(command) = &spec.command {
        args.extend(command.split_whitespace().map(str::to_string));
    }
    args
}

/// Map a failed docker invocation onto the runtime error taxonomy.
fn classify(name: &str, message: String) -> RuntimeError {
    if message.contains("No such container") || message.contains("No such object") {
        RuntimeError::NotFound(name.to_string())
    } else if message.contains("already in use") {
        RuntimeError::NameInUse(name.to_string())
    } else if message.contains("No such image")
        || message.contains("pull access denied")
        || message.contains("manifest unknown")
    {
        RuntimeError::ImageNotFound(name.to_string())
    } else {
        RuntimeError::CommandFailed(message)
    }
}

#[async_trait]
impl ContainerRuntime for DockerAdapter {
    async fn list(&self, all: bool) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let mut args = vec!["ps", "--format", "{{json .}}", "--no-trunc"];
        if all {
            args.push("-a");
        }
        let stdout = run_checked(self.command(&args), DOCKER_TIMEOUT, "docker ps")
            .await
            .map_err(RuntimeError::CommandFailed)?;

        stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str::<PsLine>(line)
                    .map(ContainerSummary::from)
                    .map_err(|e| RuntimeError::InvalidOutput(format!("docker ps line: {e}")))
            })
            .collect()
    }

    async fn inspect(&self, name: &str) -> Result<serde_json::Value, RuntimeError> {
        let stdout = run_checked(
            self.command(&["inspect", name]),
            DOCKER_TIMEOUT,
            "docker inspect",
        )
        .await
        .map_err(|e| classify(name, e))?;

        let parsed: serde_json::Value = serde_json::from_str(&stdout)
            .map_err(|e| RuntimeError::InvalidOutput(format!("docker inspect: {e}")))?;
        // docker inspect always returns an array
        match parsed.as_array().and_then(|a| a.first()) {
            Some(first) => Ok(first.clone()),
            None => Err(RuntimeError::NotFound(name.to_string())),
        }
    }

    async fn status(&self, name: &str) -> Result<String, RuntimeError> {
        run_checked(
            self.command(&["inspect", "--format", "{{.State.Status}}", name]),
            DOCKER_TIMEOUT,
            "docker inspect",
        )
        .await
        .map_err(|e| classify(name, e))
    }

    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        match run_checked(
            self.command(&["image", "inspect", image]),
            DOCKER_TIMEOUT,
            "docker image inspect",
        )
        .await
        {
            Ok(_) => Ok(true),
            Err(message) => match classify(image, message) {
                RuntimeError::NotFound(_) | RuntimeError::ImageNotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn pull(&self, image: &str) -> Result<(), RuntimeError> {
        run_checked(
            self.command(&["pull", image]),
            DOCKER_PULL_TIMEOUT,
            "docker pull",
        )
        .await
        .map(|_| ())
        .map_err(|e| classify(image, e))
    }

    async fn run(&self, spec: &RunSpec) -> Result<(), RuntimeError> {
        let args = run_args(spec);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        run_checked(self.command(&arg_refs), DOCKER_TIMEOUT, "docker run")
            .await
            .map(|_| ())
            .map_err(|e| classify(&spec.name, e))
    }

    async fn start(&self, name: &str) -> Result<(), RuntimeError> {
        run_checked(self.command(&["start", name]), DOCKER_TIMEOUT, "docker start")
            .await
            .map(|_| ())
            .map_err(|e| classify(name, e))
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        run_checked(self.command(&["stop", name]), DOCKER_TIMEOUT, "docker stop")
            .await
            .map(|_| ())
            .map_err(|e| classify(name, e))
    }

    async fn restart(&self, name: &str) -> Result<(), RuntimeError> {
        run_checked(
            self.command(&["restart", name]),
            DOCKER_TIMEOUT,
            "docker restart",
        )
        .await
        .map(|_| ())
        .map_err(|e| classify(name, e))
    }

    async fn rename(&self, old: &str, new: &str) -> Result<(), RuntimeError> {
        run_checked(
            self.command(&["rename", old, new]),
            DOCKER_TIMEOUT,
            "docker rename",
        )
        .await
        .map(|_| ())
        .map_err(|e| classify(old, e))
    }

    async fn remove(&self, name: &str, force: bool) -> Result<(), RuntimeError> {
        let mut args = vec!["rm"];
        if force {
            args.push("-f");
        }
        args.push(name);
        run_checked(self.command(&args), DOCKER_TIMEOUT, "docker rm")
            .await
            .map(|_| ())
            .map_err(|e| classify(name, e))
    }

    async fn logs(&self, name: &str, tail: u32) -> Result<String, RuntimeError> {
        let tail = tail.to_string();
        let output = crate::subprocess::run_with_timeout(
            self.command(&["logs", "--tail", &tail, name]),
            DOCKER_TIMEOUT,
            "docker logs",
        )
        .await
        .map_err(RuntimeError::CommandFailed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify(name, format!("docker logs: {}", stderr.trim())));
        }
        // App output lands on both streams; interleave stdout then stderr.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }

    async fn health(&self, name: &str) -> Result<HealthStatus, RuntimeError> {
        let stdout = run_checked(
            self.command(&[
                "inspect",
                "--format",
                "{{.State.Status}} {{if .State.Health}}{{.State.Health.Status}}{{else}}none{{end}}",
                name,
            ]),
            DOCKER_TIMEOUT,
            "docker inspect",
        )
        .await
        .map_err(|e| classify(name, e))?;

        parse_health(&stdout).ok_or_else(|| {
            RuntimeError::InvalidOutput(format!("docker health format: {stdout:?}"))
        })
    }
}

/// Parse `"<state> <health>"` from the combined inspect format.
fn parse_health(raw: &str) -> Option<HealthStatus> {
    let mut fields = raw.split_whitespace();
    let state = fields.next()?;
    let health = fields.next()?;
    let healthy = match health {
        "healthy" => true,
        // No declared health check: treat a running container as healthy.
        "none" => state == "running",
        _ => false,
    };
    Some(HealthStatus {
        healthy,
        status: health.to_string(),
    })
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
