// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Systemd unit rendering for shipped apps.
//!
//! The runtime shape is derived from the artifact metadata: standalone
//! bundles run `server.js` directly, default builds go through the package
//! manager, and static exports get no service at all (the proxy serves
//! their files).

use std::path::Path;

use nd_core::{ArtifactMetadata, OutputMode};

/// Unit name for an app's service.
pub fn unit_name(app: &str) -> String {
    format!("nextdeploy-{app}.service")
}

/// ExecStart command line for the app, or `None` for static exports.
fn exec_start(metadata: &ArtifactMetadata, doppler_token: Option<&str>) -> Option<String> {
    let base = match metadata.output_mode {
        OutputMode::Standalone => {
            format!("{} server.js", metadata.package_manager.server_runtime())
        }
        OutputMode::Default => metadata.package_manager.start_command().to_string(),
        OutputMode::Export => return None,
    };
    // Secret injection: the token fetches environment at runtime.
    let wrapped = match doppler_token {
        Some(token) => format!("doppler run --token {token} -- {base}"),
        None => base,
    };
    // systemd requires an absolute executable path.
    Some(format!("/usr/bin/env {wrapped}"))
}

/// Render the systemd unit for an app, or `None` when the output mode
/// needs no service.
pub fn render_unit(
    app: &str,
    workdir: &Path,
    metadata: &ArtifactMetadata,
    port: u16,
    doppler_token: Option<&str>,
) -> Option<String> {
    let exec = exec_start(metadata, doppler_token)?;
    Some(format!(
        "[Unit]\n\
         Description=NextDeploy app {app}\n\
         After=network.target\n\
         \n\
         [Service]\n\
         Type=simple\n\
         WorkingDirectory={workdir}\n\
         Environment=NODE_ENV=production\n\
         Environment=PORT={port}\n\
         ExecStart={exec}\n\
         Restart=always\n\
         RestartSec=5\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n",
        workdir = workdir.display(),
    ))
}

#[cfg(test)]
#[path = "service_unit_tests.rs"]
mod tests;
