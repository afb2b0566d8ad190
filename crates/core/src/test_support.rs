// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::ledger::{LedgerError, RunLedger};
use crate::run::RunRecord;
use crate::script::ScriptId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core run types.
pub mod strategies {
    use crate::run::RunStatus;
    use proptest::prelude::*;

    pub fn arb_terminal_status() -> impl Strategy<Value = RunStatus> {
        prop_oneof![
            Just(RunStatus::Success),
            Just(RunStatus::Error),
            Just(RunStatus::Timeout),
            Just(RunStatus::Exception),
        ]
    }
}

// ── In-memory ledger ────────────────────────────────────────────────────

/// Ledger that keeps records in memory and remembers every save in order.
#[derive(Default)]
pub struct MemoryLedger {
    records: Mutex<HashMap<ScriptId, RunRecord>>,
    saves: Mutex<Vec<RunRecord>>,
    fail_saves: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail with an IO error.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Every record passed to a successful `save`, oldest first.
    pub fn saves(&self) -> Vec<RunRecord> {
        self.saves.lock().clone()
    }
}

impl RunLedger for MemoryLedger {
    fn save(&self, record: RunRecord) -> Result<(), LedgerError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(LedgerError::Io(std::io::Error::other("disk full")));
        }
        self.saves.lock().push(record.clone());
        self.records.lock().insert(record.script_id.clone(), record);
        Ok(())
    }

    fn latest(&self, id: &ScriptId) -> Option<RunRecord> {
        self.records.lock().get(id).cloned()
    }

    fn all(&self) -> Vec<RunRecord> {
        let mut all: Vec<RunRecord> = self.records.lock().values().cloned().collect();
        all.sort_by(|a, b| a.script_id.cmp(&b.script_id));
        all
    }

    fn retain(&self, keep: &dyn Fn(&ScriptId) -> bool) -> Result<usize, LedgerError> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|id, _| keep(id));
        Ok(before - records.len())
    }
}
