// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::super::test_support::{dispatch_json, test_harness, TestHarness};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use std::path::PathBuf;

fn demo_tarball(h: &TestHarness, app: &str) -> PathBuf {
    let path = h.dir.path().join(format!("{app}.tgz"));
    let metadata = format!(
        r#"{{"app_name":"{app}","domain":"{app}.example.com","output_mode":"standalone","package_manager":"npm","port":3000}}"#
    );

    let file = std::fs::File::create(&path).unwrap();
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, contents) in [
        ("server.js", "console.log('hi')"),
        (".nextdeploy/metadata.json", metadata.as_str()),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
    path
}

#[tokio::test]
async fn ship_responds_with_resolved_domain() {
    let h = test_harness();
    let tarball = demo_tarball(&h, "demo");

    let response = dispatch_json(
        &h,
        json!({"type": "ship", "args": {"tarball": tarball.to_str().unwrap()}}),
    )
    .await;

    assert!(response.success, "{}", response.message);
    assert_eq!(
        response.message,
        "App demo deployed successfully to demo.example.com"
    );
    let data = response.data.unwrap();
    assert_eq!(data["app"], "demo");
    assert_eq!(data["unit"], "nextdeploy-demo.service");
    assert!(h.services.active("nextdeploy-demo.service"));
    assert_eq!(h.proxy.reloads(), 1);
    assert!(!tarball.exists());
}

#[tokio::test]
async fn ship_forwards_doppler_token() {
    let h = test_harness();
    let tarball = demo_tarball(&h, "demo");

    dispatch_json(
        &h,
        json!({"type": "ship", "args": {
            "tarball": tarball.to_str().unwrap(),
            "dopplerToken": "dp.st.token",
        }}),
    )
    .await;

    let unit = h.services.unit_contents("nextdeploy-demo.service").unwrap();
    assert!(unit.contains("doppler run --token dp.st.token --"));
}

#[tokio::test]
async fn ship_without_tarball_arg_fails() {
    let h = test_harness();
    let response = dispatch_json(&h, json!({"type": "ship", "args": {}})).await;
    assert!(!response.success);
    assert!(response.message.contains("missing required argument: tarball"));
}

#[tokio::test]
async fn ship_missing_file_fails() {
    let h = test_harness();
    let response = dispatch_json(
        &h,
        json!({"type": "ship", "args": {"tarball": "/tmp/does-not-exist.tgz"}}),
    )
    .await;
    assert!(!response.success);
    assert!(response.message.contains("tarball not found"));
}
