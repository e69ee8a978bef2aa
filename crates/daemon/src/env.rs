// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment overrides.
//!
//! Everything here mirrors a config-file field; the daemon reads no
//! environment variables that are not also settable via the config file.

use std::path::PathBuf;

/// Explicit config file path (`NEXTDEPLOY_CONFIG`).
pub(crate) fn config_override() -> Option<PathBuf> {
    std::env::var_os("NEXTDEPLOY_CONFIG").map(PathBuf::from)
}

/// Root all default paths under one directory (`NEXTDEPLOY_STATE_DIR`).
/// Used by black-box tests to sandbox the daemon.
pub(crate) fn state_dir_override() -> Option<PathBuf> {
    std::env::var_os("NEXTDEPLOY_STATE_DIR").map(PathBuf::from)
}
