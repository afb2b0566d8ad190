// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable ledger of the latest run per script.
//!
//! The whole ledger is one small JSON document. Each save rewrites it to a
//! sibling temp file, fsyncs, and renames it over the old one, so readers
//! never observe a half-written ledger.

use chrono::{DateTime, Utc};
use dm_core::{LedgerError, RunLedger, RunRecord, ScriptId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current ledger file schema version
pub const CURRENT_LEDGER_VERSION: u32 = 1;

const MAX_BAK_FILES: u32 = 3;

/// Errors opening the run ledger
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported ledger version {found} (expected at most {})", CURRENT_LEDGER_VERSION)]
    UnsupportedVersion { found: u32 },
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(rename = "v")]
    version: u32,
    saved_at: DateTime<Utc>,
    #[serde(default)]
    runs: Vec<RunRecord>,
}

/// [`RunLedger`] backed by a JSON file.
pub struct RunStore {
    path: PathBuf,
    records: Mutex<BTreeMap<ScriptId, RunRecord>>,
}

impl RunStore {
    /// Open the ledger at `path`, creating its directory if needed.
    ///
    /// A file that cannot be parsed is moved aside to a `.bak` and the store
    /// starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let records = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<LedgerFile>(&bytes) {
                Ok(file) if file.version > CURRENT_LEDGER_VERSION => {
                    return Err(StoreError::UnsupportedVersion { found: file.version });
                }
                Ok(file) => file.runs.into_iter().map(|r| (r.script_id.clone(), r)).collect(),
                Err(e) => {
                    let bak = rotate_bak_path(&path);
                    tracing::warn!(
                        path = %path.display(),
                        backup = %bak.display(),
                        error = %e,
                        "run ledger is corrupt, moving it aside"
                    );
                    fs::rename(&path, &bak)?;
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), runs = records.len(), "opened run ledger");
        Ok(Self { path, records: Mutex::new(records) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, records: &BTreeMap<ScriptId, RunRecord>) -> Result<(), LedgerError> {
        let file = LedgerFile {
            version: CURRENT_LEDGER_VERSION,
            saved_at: Utc::now(),
            runs: records.values().cloned().collect(),
        };
        let bytes = serde_json::to_vec_pretty(&file)?;

        let tmp = self.path.with_extension("json.tmp");
        let mut out = File::create(&tmp)?;
        out.write_all(&bytes)?;
        out.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl RunLedger for RunStore {
    fn save(&self, record: RunRecord) -> Result<(), LedgerError> {
        // Writes happen under the lock so the file always matches memory.
        let mut records = self.records.lock();
        let id = record.script_id.clone();
        let previous = records.insert(id.clone(), record);
        if let Err(e) = self.write(&records) {
            match previous {
                Some(previous) => records.insert(id, previous),
                None => records.remove(&id),
            };
            return Err(e);
        }
        Ok(())
    }

    fn latest(&self, id: &ScriptId) -> Option<RunRecord> {
        self.records.lock().get(id).cloned()
    }

    fn all(&self) -> Vec<RunRecord> {
        self.records.lock().values().cloned().collect()
    }

    fn retain(&self, keep: &dyn Fn(&ScriptId) -> bool) -> Result<usize, LedgerError> {
        let mut records = self.records.lock();
        let before = records.clone();
        records.retain(|id, _| keep(id));
        let removed = before.len() - records.len();
        if removed == 0 {
            return Ok(0);
        }
        if let Err(e) = self.write(&records) {
            *records = before;
            return Err(e);
        }
        tracing::info!(removed, "pruned run records for removed scripts");
        Ok(removed)
    }
}

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "runs_tests.rs"]
mod tests;
