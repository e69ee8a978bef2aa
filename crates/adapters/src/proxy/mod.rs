// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reverse proxy adapters

mod caddy;

pub use caddy::CaddyAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeProxy, ProxyCall};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from proxy operations
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to write proxy config {0}: {1}")]
    WriteConfig(String, std::io::Error),
    #[error("proxy reload failed: {0}")]
    Reload(String),
}

/// Adapter for the front-door reverse proxy.
///
/// Site fragments live in a daemon-owned include directory; the file name
/// is a deterministic function of the app name, so each file has a single
/// writer.
#[async_trait]
pub trait ProxyManager: Clone + Send + Sync + 'static {
    /// Write (or overwrite) the config fragment for an app
    async fn install_site(&self, app: &str, contents: &str) -> Result<(), ProxyError>;

    /// Delete an app's config fragment
    async fn remove_site(&self, app: &str) -> Result<(), ProxyError>;

    /// Ensure the main proxy config imports the include directory,
    /// leaving the rest of the file untouched. Returns `true` when the
    /// directive was appended.
    async fn ensure_import(&self) -> Result<bool, ProxyError>;

    /// Gracefully reload the proxy
    async fn reload(&self) -> Result<(), ProxyError>;
}
