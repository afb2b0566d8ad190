// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bookkeeping for a single run: who started it, when, and what it printed.

use dm_core::{Actor, OutputLine, OutputStream, RunRecord, RunStatus, ScriptTarget};

/// Message recorded as the stderr tail when the client goes away mid-run.
pub const CANCELLED_MESSAGE: &str = "run cancelled: client disconnected";

/// Full output of a finished run, alongside its persisted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub record: RunRecord,
    pub stdout: String,
    pub stderr: String,
}

/// Accumulates one run's output until it reaches a terminal state.
///
/// Buffers grow without bound while the run is live; truncation to the
/// tail limit only happens when the record is built.
#[derive(Debug)]
pub struct RunSession {
    target: ScriptTarget,
    actor: Actor,
    started_at_ms: u64,
    stdout: String,
    stderr: String,
}

impl RunSession {
    pub fn begin(target: ScriptTarget, actor: Actor, started_at_ms: u64) -> Self {
        Self { target, actor, started_at_ms, stdout: String::new(), stderr: String::new() }
    }

    pub fn target(&self) -> &ScriptTarget {
        &self.target
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn started_at_ms(&self) -> u64 {
        self.started_at_ms
    }

    pub fn record_output(&mut self, line: &OutputLine) {
        match line.stream {
            OutputStream::Stdout => self.stdout.push_str(&line.text),
            OutputStream::Stderr => self.stderr.push_str(&line.text),
        }
    }

    /// Close the run with whatever output was captured.
    pub fn finish(self, status: RunStatus, exit_code: Option<i32>, finished_at_ms: u64) -> RunOutcome {
        let record = RunRecord::terminal(
            self.target.id,
            status,
            self.actor,
            self.started_at_ms,
            finished_at_ms,
            exit_code,
            &self.stdout,
            &self.stderr,
        );
        RunOutcome { record, stdout: self.stdout, stderr: self.stderr }
    }

    /// Close the run as an `exception`: the message replaces stderr and
    /// stdout is discarded.
    pub fn fail(mut self, message: &str, finished_at_ms: u64) -> RunOutcome {
        self.stdout.clear();
        self.stderr = message.to_string();
        self.finish(RunStatus::Exception, None, finished_at_ms)
    }

    /// Close the run as an `exception` because the client disconnected.
    /// Output captured so far is kept.
    pub fn cancel(mut self, finished_at_ms: u64) -> RunOutcome {
        self.stderr = CANCELLED_MESSAGE.to_string();
        self.finish(RunStatus::Exception, None, finished_at_ms)
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
