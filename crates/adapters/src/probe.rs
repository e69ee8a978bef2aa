// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP health probing for workloads without a declared health check.

use async_trait::async_trait;
use std::time::Duration;

/// Default connect timeout for one probe attempt.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Liveness probe against a local port.
#[async_trait]
pub trait HealthProbe: Clone + Send + Sync + 'static {
    /// Whether something accepts connections on `127.0.0.1:<port>`
    async fn check(&self, port: u16) -> bool;
}

/// Real TCP connect probe.
#[derive(Clone)]
pub struct TcpProbe {
    timeout: Duration,
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self {
            timeout: PROBE_TIMEOUT,
        }
    }
}

impl TcpProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl HealthProbe for TcpProbe {
    async fn check(&self, port: u16) -> bool {
        let connect = tokio::net::TcpStream::connect(("127.0.0.1", port));
        matches!(tokio::time::timeout(self.timeout, connect).await, Ok(Ok(_)))
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::HealthProbe;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::Arc;

    /// Fake probe with scriptable port health
    #[derive(Clone, Default)]
    pub struct FakeProbe {
        healthy: Arc<Mutex<HashSet<u16>>>,
        checks: Arc<Mutex<Vec<u16>>>,
    }

    impl FakeProbe {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_healthy(&self, port: u16, healthy: bool) {
            let mut set = self.healthy.lock();
            if healthy {
                set.insert(port);
            } else {
                set.remove(&port);
            }
        }

        /// Ports probed so far
        pub fn checks(&self) -> Vec<u16> {
            self.checks.lock().clone()
        }
    }

    #[async_trait]
    impl HealthProbe for FakeProbe {
        async fn check(&self, port: u16) -> bool {
            self.checks.lock().push(port);
            self.healthy.lock().contains(&port)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeProbe;

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
