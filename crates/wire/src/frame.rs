// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server-push framing of run events.
//!
//! Every event becomes one self-contained `data:` block terminated by a
//! blank line, so a client can render it as soon as it arrives:
//!
//! ```text
//! data: hello
//!
//! data: [STDERR] warning: disk at 91%
//!
//! data: [FIM_DA_EXECUCAO] Status: success
//!
//! ```
//!
//! A payload spanning several lines is sent as consecutive `data:` lines of
//! the same event.

use std::time::Duration;

use dm_core::{OutputStream, RunEvent};

pub const STDERR_MARKER: &str = "[STDERR]";
pub const COMPLETED_MARKER: &str = "[FIM_DA_EXECUCAO]";
pub const TIMEOUT_MARKER: &str = "[TIMEOUT]";
pub const INTERNAL_ERROR_MARKER: &str = "[ERRO INTERNO]";

/// Content type of the push stream.
pub const CONTENT_TYPE: &str = "text/event-stream";

/// Encodes [`RunEvent`]s into `text/event-stream` frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveStreamEncoder;

impl LiveStreamEncoder {
    pub fn encode(&self, event: &RunEvent) -> String {
        encode(event)
    }
}

/// Render one event as a complete frame.
pub fn encode(event: &RunEvent) -> String {
    frame(&payload(event))
}

/// The text carried by an event, before framing.
pub fn payload(event: &RunEvent) -> String {
    match event {
        RunEvent::Output(line) => {
            let text = line.text.trim_end_matches('\n');
            match line.stream {
                OutputStream::Stdout => text.to_string(),
                OutputStream::Stderr => format!("{STDERR_MARKER} {text}"),
            }
        }
        RunEvent::Completed { status } => format!("{COMPLETED_MARKER} Status: {status}"),
        RunEvent::TimedOut { budget } => {
            format!("{TIMEOUT_MARKER} Execution exceeded {}", budget_text(*budget))
        }
        RunEvent::InternalError { message } => format!("{INTERNAL_ERROR_MARKER}: {message}"),
    }
}

/// Whole-second budgets render as `300s`; anything finer keeps its milliseconds.
fn budget_text(budget: Duration) -> String {
    if budget.subsec_nanos() == 0 {
        format!("{}s", budget.as_secs())
    } else {
        format!("{}ms", budget.as_millis())
    }
}

fn frame(payload: &str) -> String {
    let mut out = String::with_capacity(payload.len() + 8);
    for line in payload.split('\n') {
        out.push_str("data: ");
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    out
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
