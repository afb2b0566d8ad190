// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dm-engine: runs deploy scripts under supervision and records the outcome

mod error;
mod runner;
mod session;
mod supervisor;

pub use error::SupervisorError;
pub use runner::{RunnerConfig, ScriptRunner, EVENT_BUFFER};
pub use session::{RunOutcome, RunSession, CANCELLED_MESSAGE};
pub use supervisor::{Poll, ProcessState, ProcessSupervisor, SupervisorSettings};
