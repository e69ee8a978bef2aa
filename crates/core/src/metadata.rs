// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact metadata shipped inside the deployment tarball.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Location of the metadata file inside an unpacked artifact.
pub const METADATA_PATH: &str = ".nextdeploy/metadata.json";

/// Metadata errors
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read {0}: {1}")]
    Read(String, std::io::Error),

    #[error("malformed metadata in {0}: {1}")]
    Malformed(String, serde_json::Error),
}

/// How the application was built, which determines how it is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Self-contained server bundle (`server.js`)
    Standalone,
    /// Regular build started via the package manager
    Default,
    /// Static export served directly by the proxy
    Export,
}

/// Package manager the app was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

impl PackageManager {
    /// Start command for `OutputMode::Default` builds.
    pub fn start_command(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm start",
            PackageManager::Yarn => "yarn start",
            PackageManager::Pnpm => "pnpm start",
            PackageManager::Bun => "bun run start",
        }
    }

    /// Runtime used to launch a standalone `server.js`.
    pub fn server_runtime(&self) -> &'static str {
        match self {
            PackageManager::Bun => "bun",
            _ => "node",
        }
    }
}

/// Metadata embedded in the shipped tarball as `.nextdeploy/metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactMetadata {
    pub app_name: String,
    pub domain: String,
    pub output_mode: OutputMode,
    pub package_manager: PackageManager,
    pub port: u16,
    pub framework: Option<String>,
    pub version: Option<String>,
}

impl Default for ArtifactMetadata {
    fn default() -> Self {
        Self {
            app_name: "default-app".to_string(),
            domain: "localhost".to_string(),
            output_mode: OutputMode::Standalone,
            package_manager: PackageManager::Npm,
            port: 3000,
            framework: None,
            version: None,
        }
    }
}

impl ArtifactMetadata {
    /// Read metadata from an unpacked artifact directory.
    ///
    /// A missing file yields the documented defaults; a present but
    /// malformed file is a validation error.
    pub fn read_from(dir: &Path) -> Result<Self, MetadataError> {
        let path = dir.join(METADATA_PATH);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| MetadataError::Read(path.display().to_string(), e))?;
        serde_json::from_str(&raw)
            .map_err(|e| MetadataError::Malformed(path.display().to_string(), e))
    }
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
