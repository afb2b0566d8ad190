// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dm-storage: on-disk state for the deploy manager
//!
//! - [`RunStore`]: the durable run ledger
//! - [`ScriptRegistry`]: deploy script discovery and resolution
//! - [`SecretVault`]: the secret file editor's file access

mod registry;
mod runs;
mod secrets;

pub use registry::{RegistryError, ScriptRegistry, SCRIPT_PREFIX, SCRIPT_SUFFIX};
pub use runs::{RunStore, StoreError, CURRENT_LEDGER_VERSION};
pub use secrets::{base_name, SecretError, SecretFile, SecretVault, ALLOWED_EXTENSIONS};
