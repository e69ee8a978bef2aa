// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use nd_core::PackageManager;
use yare::parameterized;

fn metadata(mode: OutputMode, pm: PackageManager) -> ArtifactMetadata {
    ArtifactMetadata {
        app_name: "demo".to_string(),
        output_mode: mode,
        package_manager: pm,
        ..Default::default()
    }
}

#[test]
fn unit_name_is_prefixed() {
    assert_eq!(unit_name("demo"), "nextdeploy-demo.service");
}

#[parameterized(
    standalone_node = { OutputMode::Standalone, PackageManager::Npm, "/usr/bin/env node server.js" },
    standalone_bun = { OutputMode::Standalone, PackageManager::Bun, "/usr/bin/env bun server.js" },
    default_npm = { OutputMode::Default, PackageManager::Npm, "/usr/bin/env npm start" },
    default_yarn = { OutputMode::Default, PackageManager::Yarn, "/usr/bin/env yarn start" },
    default_pnpm = { OutputMode::Default, PackageManager::Pnpm, "/usr/bin/env pnpm start" },
    default_bun = { OutputMode::Default, PackageManager::Bun, "/usr/bin/env bun run start" },
)]
fn exec_start_table(mode: OutputMode, pm: PackageManager, expected: &str) {
    let unit = render_unit(
        "demo",
        Path::new("/var/lib/nextdeploy/apps/demo/current"),
        &metadata(mode, pm),
        3000,
        None,
    )
    .unwrap();
    assert!(
        unit.contains(&format!("ExecStart={expected}")),
        "unit was:\n{unit}"
    );
}

#[test]
fn export_mode_has_no_service() {
    assert!(render_unit(
        "demo",
        Path::new("/tmp/x"),
        &metadata(OutputMode::Export, PackageManager::Npm),
        3000,
        None
    )
    .is_none());
}

#[test]
fn unit_sets_environment_and_workdir() {
    let unit = render_unit(
        "demo",
        Path::new("/var/lib/nextdeploy/apps/demo/current"),
        &metadata(OutputMode::Standalone, PackageManager::Npm),
        4100,
        None,
    )
    .unwrap();

    assert!(unit.contains("WorkingDirectory=/var/lib/nextdeploy/apps/demo/current"));
    assert!(unit.contains("Environment=NODE_ENV=production"));
    assert!(unit.contains("Environment=PORT=4100"));
    assert!(unit.contains("Restart=always"));
    assert!(unit.contains("WantedBy=multi-user.target"));
}

#[test]
fn doppler_token_wraps_exec_start() {
    let unit = render_unit(
        "demo",
        Path::new("/tmp/x"),
        &metadata(OutputMode::Standalone, PackageManager::Npm),
        3000,
        Some("dp.st.xyz"),
    )
    .unwrap();
    assert!(unit.contains("ExecStart=/usr/bin/env doppler run --token dp.st.xyz -- node server.js"));
}
