// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events produced by a live run, in emission order.

use crate::run::RunStatus;
use std::time::Duration;

/// Which pipe of the child a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

crate::simple_display! {
    OutputStream {
        Stdout => "stdout",
        Stderr => "stderr",
    }
}

/// One cleaned line (or carriage-return separated burst) of child output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    /// ANSI-free text; a trailing newline, if the child wrote one, is kept.
    pub text: String,
}

impl OutputLine {
    pub fn new(stream: OutputStream, text: impl Into<String>) -> Self {
        Self { stream, text: text.into() }
    }

    pub fn stdout(text: impl Into<String>) -> Self {
        Self::new(OutputStream::Stdout, text)
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self::new(OutputStream::Stderr, text)
    }
}

/// A run produces zero or more `Output` events followed by exactly one
/// terminal event. Nothing follows a terminal event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Output(OutputLine),
    TimedOut { budget: Duration },
    Completed { status: RunStatus },
    InternalError { message: String },
}

impl RunEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunEvent::Output(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            RunEvent::Output(_) => "output",
            RunEvent::TimedOut { .. } => "timed-out",
            RunEvent::Completed { .. } => "completed",
            RunEvent::InternalError { .. } => "internal-error",
        }
    }
}
