// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-app named locks.
//!
//! Two different apps may deploy in parallel; a second deploy of the same
//! app waits for the first. Lock entries are created on first use and kept
//! for the daemon's lifetime (the set of app names is small).

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Map of named async locks, acquired by app name.
#[derive(Clone, Default)]
pub struct AppLocks {
    inner: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl AppLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `name`, waiting if another holder is active.
    pub async fn acquire(&self, name: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock();
            Arc::clone(
                map.entry(name.to_string())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
#[path = "locks_tests.rs"]
mod tests;
