// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caddy site fragment rendering.

use std::path::Path;

/// Security header block shared by the static shapes.
const SECURITY_HEADERS: &str = "\theader {\n\
     \t\tStrict-Transport-Security \"max-age=31536000; includeSubDomains\"\n\
     \t\tX-Content-Type-Options \"nosniff\"\n\
     \t\tX-Frame-Options \"SAMEORIGIN\"\n\
     \t\tReferrer-Policy \"strict-origin-when-cross-origin\"\n\
     \t}\n";

/// Site for a static export: files served straight from the release.
pub fn static_site(domain: &str, root: &Path) -> String {
    format!(
        "{domain} {{\n\
         \troot * {root}\n\
         \tencode gzip zstd\n\
         {SECURITY_HEADERS}\
         \tfile_server\n\
         }}\n",
        root = root.display(),
    )
}

/// Site for a dynamic app: framework static assets from disk with
/// immutable caching, everything else proxied to the app server.
pub fn dynamic_site(domain: &str, port: u16, static_root: &Path) -> String {
    format!(
        "{domain} {{\n\
         \tencode gzip zstd\n\
         \n\
         \thandle_path /_next/static/* {{\n\
         \t\troot * {static_root}\n\
         \t\theader Cache-Control \"public, max-age=31536000, immutable\"\n\
         \t\tfile_server\n\
         \t}}\n\
         \n\
         \thandle {{\n\
         \t\treverse_proxy localhost:{port}\n\
         \t}}\n\
         }}\n",
        static_root = static_root.display(),
    )
}

/// Minimal proxy site used by blue/green cutover, where only the upstream
/// port changes.
pub fn proxy_site(domain: &str, port: u16) -> String {
    format!(
        "{domain} {{\n\
         \tencode gzip zstd\n\
         \treverse_proxy localhost:{port}\n\
         }}\n"
    )
}

#[cfg(test)]
#[path = "site_config_tests.rs"]
mod tests;
