// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dm-core: Core library for the deploy manager daemon

pub mod macros;

pub mod ansi;
pub mod clock;
pub mod event;
pub mod ledger;
pub mod run;
pub mod script;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use ansi::clean;
pub use clock::{Clock, Deadline, FakeClock, SystemClock};
pub use event::{OutputLine, OutputStream, RunEvent};
pub use ledger::{LedgerError, RunLedger};
#[cfg(any(test, feature = "test-support"))]
pub use run::RunRecordBuilder;
pub use run::{tail, RunRecord, RunStatus, TAIL_LIMIT};
pub use script::{Actor, ScriptId, ScriptTarget};
