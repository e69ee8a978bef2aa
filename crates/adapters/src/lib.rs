// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the daemon's external collaborators: the container
//! runtime, the host service manager, the reverse proxy, and TCP health
//! probing. Each trait has a CLI-driving implementation and a recorded-call
//! fake behind the `test-support` feature.

pub mod probe;
pub mod proxy;
pub mod runtime;
pub mod service;
pub mod subprocess;

pub use probe::{HealthProbe, TcpProbe};
pub use proxy::{CaddyAdapter, ProxyError, ProxyManager};
pub use runtime::{
    first_published_port, ContainerRuntime, ContainerSummary, DockerAdapter, HealthStatus, RunSpec,
    RuntimeError,
};
pub use service::{ServiceError, ServiceManager, SystemdAdapter};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use probe::FakeProbe;
#[cfg(any(test, feature = "test-support"))]
pub use proxy::{FakeProxy, ProxyCall};
#[cfg(any(test, feature = "test-support"))]
pub use runtime::{FakeContainer, FakeRuntime, RuntimeCall};
#[cfg(any(test, feature = "test-support"))]
pub use service::{FakeServiceManager, ServiceCall};
