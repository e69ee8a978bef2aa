// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NextDeploy Daemon library
//!
//! This module exposes the control-plane protocol types for use by CLI
//! clients.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod protocol;

pub use protocol::{
    read_command, write_response, Command, ProtocolError, Response, CONNECTION_DEADLINE,
    MAX_MESSAGE_SIZE,
};
