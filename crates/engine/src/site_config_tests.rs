// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn static_site_serves_files_with_security_headers() {
    let site = static_site("demo.example.com", Path::new("/apps/demo/current/out"));

    assert!(site.starts_with("demo.example.com {"));
    assert!(site.contains("root * /apps/demo/current/out"));
    assert!(site.contains("file_server"));
    assert!(site.contains("encode gzip zstd"));
    assert!(site.contains("Strict-Transport-Security"));
    assert!(site.contains("X-Content-Type-Options \"nosniff\""));
    assert!(site.contains("X-Frame-Options \"SAMEORIGIN\""));
    assert!(site.contains("Referrer-Policy \"strict-origin-when-cross-origin\""));
    assert!(site.trim_end().ends_with('}'));
}

#[test]
fn dynamic_site_splits_static_prefix_from_proxy() {
    let site = dynamic_site(
        "demo.example.com",
        3000,
        Path::new("/apps/demo/current/.next/static"),
    );

    assert!(site.contains("handle_path /_next/static/*"));
    assert!(site.contains("root * /apps/demo/current/.next/static"));
    assert!(site.contains("Cache-Control \"public, max-age=31536000, immutable\""));
    assert!(site.contains("reverse_proxy localhost:3000"));
}

#[test]
fn proxy_site_points_at_port() {
    let site = proxy_site("api.example.com", 3002);
    assert!(site.starts_with("api.example.com {"));
    assert!(site.contains("reverse_proxy localhost:3002"));
    assert!(!site.contains("file_server"));
}
