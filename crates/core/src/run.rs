// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted outcome of a script's latest run.

use crate::script::{Actor, ScriptId};
use serde::{Deserialize, Serialize};

/// Maximum number of characters of each output stream kept in a record.
pub const TAIL_LIMIT: usize = 10_000;

/// Outcome label of a run.
///
/// `Unset` only describes a script that has never run; every persisted run
/// carries one of the four terminal labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Unset,
    Success,
    Error,
    Timeout,
    Exception,
}

crate::simple_display! {
    RunStatus {
        Unset => "unset",
        Success => "success",
        Error => "error",
        Timeout => "timeout",
        Exception => "exception",
    }
}

impl RunStatus {
    /// Classify a normal process exit.
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            RunStatus::Success
        } else {
            RunStatus::Error
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Unset)
    }
}

/// Keep only the last `limit` characters of `text`.
///
/// Truncation always drops from the head so the most recent output survives.
pub fn tail(text: &str, limit: usize) -> &str {
    if limit == 0 {
        return "";
    }
    match text.char_indices().rev().nth(limit - 1) {
        Some((start, _)) => &text[start..],
        None => text,
    }
}

/// Latest run of one script. Overwritten in place by the next run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub script_id: ScriptId,
    pub status: RunStatus,
    pub actor: Option<Actor>,
    pub started_at_ms: u64,
    #[serde(default)]
    pub finished_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub stdout_tail: String,
    #[serde(default)]
    pub stderr_tail: String,
}

impl RunRecord {
    /// Build the terminal record for a run, truncating both streams to
    /// [`TAIL_LIMIT`] characters.
    #[allow(clippy::too_many_arguments)]
    pub fn terminal(
        script_id: ScriptId,
        status: RunStatus,
        actor: Actor,
        started_at_ms: u64,
        finished_at_ms: u64,
        exit_code: Option<i32>,
        stdout: &str,
        stderr: &str,
    ) -> Self {
        Self {
            script_id,
            status,
            actor: Some(actor),
            started_at_ms,
            finished_at_ms,
            exit_code,
            stdout_tail: tail(stdout, TAIL_LIMIT).to_string(),
            stderr_tail: tail(stderr, TAIL_LIMIT).to_string(),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.finished_at_ms.saturating_sub(self.started_at_ms)
    }
}

crate::builder! {
    pub struct RunRecordBuilder => RunRecord {
        into {
            script_id: ScriptId = "test-script",
            stdout_tail: String = "",
            stderr_tail: String = "",
        }
        set {
            status: RunStatus = RunStatus::Success,
            actor: Option<Actor> = Some(Actor::new("tester")),
            started_at_ms: u64 = 1_000_000,
            finished_at_ms: u64 = 1_001_000,
            exit_code: Option<i32> = Some(0),
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
