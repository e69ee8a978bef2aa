// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! nd-engine: deployment engine — traffic switching, the ship pipeline,
//! config rendering, and the health monitor.

mod error;
mod locks;
mod monitor;
mod service_unit;
mod ship;
mod site_config;
mod switch;

pub use error::EngineError;
pub use locks::AppLocks;
pub use monitor::HealthMonitor;
pub use service_unit::{render_unit, unit_name};
pub use ship::{ShipEngine, ShipOutcome};
pub use site_config::{dynamic_site, proxy_site, static_site};
pub use switch::{container_base_name, SwitchConfig, SwitchEngine};
