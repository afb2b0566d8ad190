// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire formats of the deploy manager's HTTP surface.
//!
//! - [`frame`]: `text/event-stream` framing of live run events
//! - [`views`]: JSON bodies

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod frame;
mod views;

pub use frame::{encode, LiveStreamEncoder, CONTENT_TYPE};
pub use views::{
    rfc3339, DashboardSummary, ErrorBody, Health, LastRun, RunRecordView, RunView, ScriptView,
    SecretContent, SecretEntry,
};
