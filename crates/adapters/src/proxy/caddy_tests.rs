// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn adapter(root: &std::path::Path) -> CaddyAdapter {
    CaddyAdapter::new(root.join("nextdeploy.d"), root.join("Caddyfile"))
}

#[tokio::test]
async fn install_site_writes_fragment() {
    let dir = tempdir().unwrap();
    let caddy = adapter(dir.path());

    caddy
        .install_site("demo", "demo.example.com {\n}\n")
        .await
        .unwrap();

    let written = std::fs::read_to_string(dir.path().join("nextdeploy.d/demo.conf")).unwrap();
    assert_eq!(written, "demo.example.com {\n}\n");
}

#[tokio::test]
async fn install_site_overwrites_previous_fragment() {
    let dir = tempdir().unwrap();
    let caddy = adapter(dir.path());

    caddy.install_site("demo", "v1").await.unwrap();
    caddy.install_site("demo", "v2").await.unwrap();

    let written = std::fs::read_to_string(caddy.site_path("demo")).unwrap();
    assert_eq!(written, "v2");
}

#[tokio::test]
async fn remove_site_deletes_fragment_and_tolerates_absence() {
    let dir = tempdir().unwrap();
    let caddy = adapter(dir.path());

    caddy.install_site("demo", "x").await.unwrap();
    caddy.remove_site("demo").await.unwrap();
    assert!(!caddy.site_path("demo").exists());

    // A second remove is fine.
    caddy.remove_site("demo").await.unwrap();
}

#[tokio::test]
async fn ensure_import_appends_once_and_preserves_content() {
    let dir = tempdir().unwrap();
    let caddy = adapter(dir.path());
    let main = dir.path().join("Caddyfile");
    std::fs::write(&main, "existing.example.com {\n\trespond \"hi\"\n}\n").unwrap();

    assert!(caddy.ensure_import().await.unwrap());
    let updated = std::fs::read_to_string(&main).unwrap();
    assert!(updated.starts_with("existing.example.com {"));
    assert!(updated.trim_end().ends_with(&format!(
        "import {}/*.conf",
        dir.path().join("nextdeploy.d").display()
    )));

    // Idempotent: second call appends nothing.
    assert!(!caddy.ensure_import().await.unwrap());
    assert_eq!(std::fs::read_to_string(&main).unwrap(), updated);
}

#[tokio::test]
async fn ensure_import_creates_missing_main_config() {
    let dir = tempdir().unwrap();
    let caddy = adapter(dir.path());

    assert!(caddy.ensure_import().await.unwrap());
    let written = std::fs::read_to_string(dir.path().join("Caddyfile")).unwrap();
    assert_eq!(
        written.trim_end(),
        format!("import {}/*.conf", dir.path().join("nextdeploy.d").display())
    );
}
