// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! nd-storage: artifact unpacking and the on-disk release store

mod release;
mod unpack;

pub use release::{Release, ReleaseStore, StoreError};
pub use unpack::{unpack_archive, UnpackError, UnpackSummary};
