// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the deployment engine

use nd_adapters::{ProxyError, RuntimeError, ServiceError};
use nd_core::MetadataError;
use nd_storage::{StoreError, UnpackError};
use thiserror::Error;

/// Errors that can occur while deploying or switching traffic
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("service error: {0}")]
    Service(#[from] ServiceError),
    #[error("proxy error: {0}")]
    Proxy(#[from] ProxyError),
    #[error("unpack error: {0}")]
    Unpack(#[from] UnpackError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),
    #[error("{0}")]
    Validation(String),
    #[error("health check failed for {name} on port {port}")]
    HealthGate { name: String, port: u16 },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
