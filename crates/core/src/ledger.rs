// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence seam for run records.

use crate::run::RunRecord;
use crate::script::ScriptId;
use thiserror::Error;

/// Errors from persisting run records
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Keeps the latest [`RunRecord`] per script (last write wins).
///
/// `save` must only return once the record is durable: callers announce a
/// run's terminal state to clients right after it returns.
pub trait RunLedger: Send + Sync {
    fn save(&self, record: RunRecord) -> Result<(), LedgerError>;

    fn latest(&self, id: &ScriptId) -> Option<RunRecord>;

    fn all(&self) -> Vec<RunRecord>;

    /// Drop records whose script no longer exists. Returns how many were removed.
    fn retain(&self, keep: &dyn Fn(&ScriptId) -> bool) -> Result<usize, LedgerError>;
}
