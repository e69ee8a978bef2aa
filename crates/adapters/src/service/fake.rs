// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake service manager for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ServiceError, ServiceManager};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Recorded service call
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    InstallUnit { unit: String },
    Start { unit: String },
    Stop { unit: String },
    Restart { unit: String },
    Remove { unit: String },
    IsActive { unit: String },
}

#[derive(Debug, Clone)]
struct FakeUnit {
    contents: String,
    active: bool,
}

struct FakeServiceState {
    units: HashMap<String, FakeUnit>,
    calls: Vec<ServiceCall>,
    fail_start: HashSet<String>,
}

/// Fake service manager for testing
#[derive(Clone)]
pub struct FakeServiceManager {
    inner: Arc<Mutex<FakeServiceState>>,
}

impl Default for FakeServiceManager {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeServiceState {
                units: HashMap::new(),
                calls: Vec::new(),
                fail_start: HashSet::new(),
            })),
        }
    }
}

impl FakeServiceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.inner.lock().calls.clone()
    }

    /// Contents of an installed unit
    pub fn unit_contents(&self, unit: &str) -> Option<String> {
        self.inner.lock().units.get(unit).map(|u| u.contents.clone())
    }

    /// Whether a unit is installed and active
    pub fn active(&self, unit: &str) -> bool {
        self.inner
            .lock()
            .units
            .get(unit)
            .map(|u| u.active)
            .unwrap_or(false)
    }

    /// Make `start`/`restart` fail for this unit
    pub fn fail_start_of(&self, unit: &str) {
        self.inner.lock().fail_start.insert(unit.to_string());
    }
}

#[async_trait]
impl ServiceManager for FakeServiceManager {
    async fn install_unit(&self, unit: &str, contents: &str) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ServiceCall::InstallUnit {
            unit: unit.to_string(),
        });
        inner.units.insert(
            unit.to_string(),
            FakeUnit {
                contents: contents.to_string(),
                active: false,
            },
        );
        Ok(())
    }

    async fn start(&self, unit: &str) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ServiceCall::Start {
            unit: unit.to_string(),
        });

        if inner.fail_start.contains(unit) {
            return Err(ServiceError::StartFailed {
                unit: unit.to_string(),
                message: "simulated start failure".to_string(),
            });
        }
        match inner.units.get_mut(unit) {
            Some(u) => {
                u.active = true;
                Ok(())
            }
            None => Err(ServiceError::StartFailed {
                unit: unit.to_string(),
                message: "unit not installed".to_string(),
            }),
        }
    }

    async fn stop(&self, unit: &str) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ServiceCall::Stop {
            unit: unit.to_string(),
        });

        // Missing unit is ignored, like the systemd adapter.
        if let Some(u) = inner.units.get_mut(unit) {
            u.active = false;
        }
        Ok(())
    }

    async fn restart(&self, unit: &str) -> Result<(), ServiceError> {
        {
            let mut inner = self.inner.lock();
            inner.calls.push(ServiceCall::Restart {
                unit: unit.to_string(),
            });

            if inner.fail_start.contains(unit) {
                return Err(ServiceError::StartFailed {
                    unit: unit.to_string(),
                    message: "simulated restart failure".to_string(),
                });
            }
            if let Some(u) = inner.units.get_mut(unit) {
                u.active = true;
                return Ok(());
            }
        }
        Err(ServiceError::StartFailed {
            unit: unit.to_string(),
            message: "unit not installed".to_string(),
        })
    }

    async fn remove(&self, unit: &str) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ServiceCall::Remove {
            unit: unit.to_string(),
        });
        inner.units.remove(unit);
        Ok(())
    }

    async fn is_active(&self, unit: &str) -> Result<bool, ServiceError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ServiceCall::IsActive {
            unit: unit.to_string(),
        });
        Ok(inner.units.get(unit).map(|u| u.active).unwrap_or(false))
    }
}
