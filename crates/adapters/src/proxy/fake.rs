// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake proxy manager for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ProxyError, ProxyManager};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Recorded proxy call
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyCall {
    InstallSite { app: String },
    RemoveSite { app: String },
    EnsureImport,
    Reload,
}

struct FakeProxyState {
    sites: HashMap<String, String>,
    calls: Vec<ProxyCall>,
    import_ensured: bool,
    reloads: usize,
    fail_reload: bool,
}

/// Fake proxy manager for testing
#[derive(Clone)]
pub struct FakeProxy {
    inner: Arc<Mutex<FakeProxyState>>,
}

impl Default for FakeProxy {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeProxyState {
                sites: HashMap::new(),
                calls: Vec::new(),
                import_ensured: false,
                reloads: 0,
                fail_reload: false,
            })),
        }
    }
}

impl FakeProxy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ProxyCall> {
        self.inner.lock().calls.clone()
    }

    /// Installed fragment for an app
    pub fn site(&self, app: &str) -> Option<String> {
        self.inner.lock().sites.get(app).cloned()
    }

    /// Number of reloads issued
    pub fn reloads(&self) -> usize {
        self.inner.lock().reloads
    }

    /// Whether the import directive has been ensured
    pub fn import_ensured(&self) -> bool {
        self.inner.lock().import_ensured
    }

    /// Make `reload` fail
    pub fn fail_reloads(&self) {
        self.inner.lock().fail_reload = true;
    }
}

#[async_trait]
impl ProxyManager for FakeProxy {
    async fn install_site(&self, app: &str, contents: &str) -> Result<(), ProxyError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProxyCall::InstallSite {
            app: app.to_string(),
        });
        inner.sites.insert(app.to_string(), contents.to_string());
        Ok(())
    }

    async fn remove_site(&self, app: &str) -> Result<(), ProxyError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProxyCall::RemoveSite {
            app: app.to_string(),
        });
        inner.sites.remove(app);
        Ok(())
    }

    async fn ensure_import(&self) -> Result<bool, ProxyError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProxyCall::EnsureImport);
        let appended = !inner.import_ensured;
        inner.import_ensured = true;
        Ok(appended)
    }

    async fn reload(&self) -> Result<(), ProxyError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProxyCall::Reload);
        if inner.fail_reload {
            return Err(ProxyError::Reload("simulated reload failure".to_string()));
        }
        inner.reloads += 1;
        Ok(())
    }
}
