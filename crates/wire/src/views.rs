// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON bodies of the HTTP surface.

use chrono::{DateTime, SecondsFormat, Utc};
use dm_core::{RunRecord, RunStatus, ScriptId, ScriptTarget};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Render epoch milliseconds as RFC 3339 (UTC, second precision).
///
/// Zero means "never" and renders as `None`.
pub fn rfc3339(epoch_ms: u64) -> Option<String> {
    if epoch_ms == 0 {
        return None;
    }
    let ms = i64::try_from(epoch_ms).ok()?;
    DateTime::<Utc>::from_timestamp_millis(ms).map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// A persisted run as shown to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecordView {
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub stdout_tail: String,
    pub stderr_tail: String,
}

impl From<&RunRecord> for RunRecordView {
    fn from(record: &RunRecord) -> Self {
        Self {
            status: record.status,
            actor: record.actor.as_ref().map(|a| a.to_string()),
            started_at: rfc3339(record.started_at_ms),
            finished_at: rfc3339(record.finished_at_ms),
            duration_ms: record.duration_ms(),
            exit_code: record.exit_code,
            stdout_tail: record.stdout_tail.clone(),
            stderr_tail: record.stderr_tail.clone(),
        }
    }
}

/// A script and its latest run, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptView {
    pub id: ScriptId,
    pub name: String,
    /// `unset` until the script has run once.
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<RunRecordView>,
}

impl ScriptView {
    pub fn new(target: &ScriptTarget, record: Option<&RunRecord>) -> Self {
        Self {
            id: target.id.clone(),
            name: target.name.clone(),
            status: record.map(|r| r.status).unwrap_or_default(),
            last_run: record.map(RunRecordView::from),
        }
    }
}

/// Result of a blocking run: the updated script plus the full output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunView {
    pub script: ScriptView,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastRun {
    pub script_id: ScriptId,
    pub name: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
}

/// Dashboard counters over the scripts currently on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_scripts: usize,
    pub success_count: usize,
    pub error_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<LastRun>,
}

impl DashboardSummary {
    /// Records without a matching target are ignored.
    pub fn compute(targets: &[ScriptTarget], records: &[RunRecord]) -> Self {
        let by_id: HashMap<&ScriptId, &RunRecord> =
            records.iter().map(|r| (&r.script_id, r)).collect();
        let latest: Vec<(&ScriptTarget, &RunRecord)> =
            targets.iter().filter_map(|t| by_id.get(&t.id).map(|r| (t, *r))).collect();

        let count = |status: RunStatus| latest.iter().filter(|(_, r)| r.status == status).count();
        let last_run = latest
            .iter()
            .max_by_key(|(_, r)| (r.finished_at_ms.max(r.started_at_ms), r.script_id.clone()))
            .map(|(t, r)| LastRun {
                script_id: t.id.clone(),
                name: t.name.clone(),
                status: r.status,
                finished_at: rfc3339(r.finished_at_ms),
            });

        Self {
            total_scripts: targets.len(),
            success_count: count(RunStatus::Success),
            error_count: count(RunStatus::Error),
            last_run,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretEntry {
    pub name: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    pub extension: String,
}

impl SecretEntry {
    pub fn new(name: String, size: u64, modified_ms: i64, extension: String) -> Self {
        let modified_at = u64::try_from(modified_ms).ok().and_then(rfc3339);
        Self { name, size, modified_at, extension }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretContent {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

impl Health {
    pub fn ok() -> Self {
        Self { status: "OK".to_string() }
    }
}

/// Body of every non-2xx JSON response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
#[path = "views_tests.rs"]
mod tests;
