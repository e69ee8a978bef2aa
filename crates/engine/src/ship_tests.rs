// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use flate2::write::GzEncoder;
use flate2::Compression;
use nd_adapters::{FakeProxy, FakeServiceManager, ServiceCall};
use nd_core::FakeClock;
use tempfile::tempdir;

fn write_tarball(path: &Path, files: &[(&str, &str)]) {
    let file = std::fs::File::create(path).unwrap();
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

fn demo_metadata(app: &str, mode: &str) -> String {
    format!(
        r#"{{"app_name":"{app}","domain":"{app}.example.com","output_mode":"{mode}","package_manager":"npm","port":3000}}"#
    )
}

struct Harness {
    root: tempfile::TempDir,
    services: FakeServiceManager,
    proxy: FakeProxy,
    clock: FakeClock,
    engine: ShipEngine<FakeServiceManager, FakeProxy, FakeClock>,
}

fn harness() -> Harness {
    let root = tempdir().unwrap();
    let services = FakeServiceManager::new();
    let proxy = FakeProxy::new();
    let clock = FakeClock::new();
    clock.set_epoch_secs(1_000);
    let engine = ShipEngine::new(
        root.path().join("apps"),
        services.clone(),
        proxy.clone(),
        clock.clone(),
    );
    Harness {
        root,
        services,
        proxy,
        clock,
        engine,
    }
}

fn demo_tarball(h: &Harness, name: &str, app: &str, mode: &str) -> PathBuf {
    let path = h.root.path().join(name);
    write_tarball(
        &path,
        &[
            ("server.js", "console.log('hi')"),
            (".nextdeploy/metadata.json", &demo_metadata(app, mode)),
        ],
    );
    path
}

#[tokio::test]
async fn fresh_ship_lays_down_release_service_and_proxy() {
    let h = harness();
    let tarball = demo_tarball(&h, "demo-1.tgz", "demo", "standalone");

    let outcome = h.engine.ship(&tarball, None).await.unwrap();

    assert_eq!(outcome.app_name, "demo");
    assert_eq!(outcome.domain, "demo.example.com");
    assert_eq!(outcome.release.timestamp, 1_000);

    // current is a symlink resolving under releases/ and the release
    // carries the metadata it was shipped with.
    let store = h.engine.store();
    let current = store.current("demo").unwrap();
    assert!(current.starts_with(store.releases_dir("demo")));
    assert!(current.join("server.js").exists());
    let meta = ArtifactMetadata::read_from(&current).unwrap();
    assert_eq!(meta.app_name, "demo");

    // Service unit installed, pointed at current/, and started.
    let unit = outcome.unit.unwrap();
    assert_eq!(unit, "nextdeploy-demo.service");
    let contents = h.services.unit_contents(&unit).unwrap();
    assert!(contents.contains(&format!(
        "WorkingDirectory={}",
        store.current_link("demo").display()
    )));
    assert!(h.services.active(&unit));

    // Proxy fragment emitted, import stitched, proxy reloaded.
    let fragment = h.proxy.site("demo").unwrap();
    assert!(fragment.contains("demo.example.com"));
    assert!(fragment.contains("reverse_proxy localhost:3000"));
    assert!(h.proxy.import_ensured());
    assert_eq!(h.proxy.reloads(), 1);

    // The shipped tarball is consumed.
    assert!(!tarball.exists());
}

#[tokio::test]
async fn second_ship_upgrades_and_restarts_service() {
    let h = harness();
    let first = demo_tarball(&h, "demo-1.tgz", "demo", "standalone");
    h.engine.ship(&first, None).await.unwrap();

    h.clock.set_epoch_secs(2_000);
    let second = demo_tarball(&h, "demo-2.tgz", "demo", "standalone");
    let outcome = h.engine.ship(&second, None).await.unwrap();

    // Both releases exist; current points at the new one; the old
    // release directory is unchanged.
    let store = h.engine.store();
    assert_eq!(store.list_releases("demo").unwrap(), vec![1_000, 2_000]);
    assert_eq!(
        store.current("demo").unwrap(),
        store.releases_dir("demo").join("2000")
    );
    assert!(store.releases_dir("demo").join("1000/server.js").exists());
    assert_eq!(outcome.release.timestamp, 2_000);

    // The already-active service was restarted, not started twice.
    let calls = h.services.calls();
    assert!(calls.contains(&ServiceCall::Restart {
        unit: "nextdeploy-demo.service".to_string()
    }));
    assert_eq!(h.proxy.reloads(), 2);
}

#[tokio::test]
async fn export_mode_skips_service_and_serves_files() {
    let h = harness();
    let tarball = demo_tarball(&h, "site-1.tgz", "site", "export");

    let outcome = h.engine.ship(&tarball, None).await.unwrap();

    assert!(outcome.unit.is_none());
    assert!(h.services.calls().is_empty());

    let fragment = h.proxy.site("site").unwrap();
    assert!(fragment.contains("file_server"));
    assert!(fragment.contains("current/out"));
    assert!(!fragment.contains("reverse_proxy"));
}

#[tokio::test]
async fn doppler_token_reaches_the_unit() {
    let h = harness();
    let tarball = demo_tarball(&h, "demo-1.tgz", "demo", "standalone");

    h.engine.ship(&tarball, Some("dp.st.abc")).await.unwrap();

    let contents = h
        .services
        .unit_contents("nextdeploy-demo.service")
        .unwrap();
    assert!(contents.contains("doppler run --token dp.st.abc --"));
}

#[tokio::test]
async fn failed_service_start_keeps_the_flip_and_the_tarball() {
    let h = harness();
    h.services.fail_start_of("nextdeploy-demo.service");
    let tarball = demo_tarball(&h, "demo-1.tgz", "demo", "standalone");

    let err = h.engine.ship(&tarball, None).await.unwrap_err();
    assert!(err.to_string().contains("service"), "got: {err}");

    // The current flip is not rolled back; re-issuing ship on the same
    // tarball retries the remaining stages.
    let store = h.engine.store();
    assert_eq!(
        store.current("demo").unwrap(),
        store.releases_dir("demo").join("1000")
    );
    assert!(tarball.exists());
    // Traffic was never moved.
    assert_eq!(h.proxy.reloads(), 0);
}

#[tokio::test]
async fn failed_proxy_reload_surfaces_but_release_stays() {
    let h = harness();
    h.proxy.fail_reloads();
    let tarball = demo_tarball(&h, "demo-1.tgz", "demo", "standalone");

    let err = h.engine.ship(&tarball, None).await.unwrap_err();
    assert!(err.to_string().contains("reload"), "got: {err}");
    assert!(h.engine.store().current("demo").is_some());
}

#[tokio::test]
async fn missing_tarball_is_rejected() {
    let h = harness();
    let err = h
        .engine
        .ship(&h.root.path().join("ghost.tgz"), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("tarball not found"));
}

#[tokio::test]
async fn malformed_metadata_cleans_up_staging() {
    let h = harness();
    let tarball = h.root.path().join("bad.tgz");
    write_tarball(
        &tarball,
        &[
            ("server.js", "x"),
            (".nextdeploy/metadata.json", "{not json"),
        ],
    );

    let err = h.engine.ship(&tarball, None).await.unwrap_err();
    assert!(matches!(err, EngineError::Metadata(_)));

    // No staging leftovers and no release was promoted.
    let apps_root = h.root.path().join("apps");
    let leftovers: Vec<_> = std::fs::read_dir(&apps_root)
        .map(|rd| rd.filter_map(|e| e.ok()).collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty(), "leftovers: {leftovers:?}");
}

#[tokio::test]
async fn missing_metadata_file_ships_with_defaults() {
    let h = harness();
    let tarball = h.root.path().join("plain.tgz");
    write_tarball(&tarball, &[("server.js", "x")]);

    let outcome = h.engine.ship(&tarball, None).await.unwrap();
    assert_eq!(outcome.app_name, "default-app");
    assert_eq!(outcome.domain, "localhost");
}
