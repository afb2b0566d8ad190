// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deploy script discovery and id → path resolution.
//!
//! Scripts live directly in the deploy root as `deploy_<id>.sh`. Client
//! input only ever reaches the filesystem through [`ScriptRegistry::resolve`],
//! which validates the id and confines the canonical path to the root.

use dm_core::{LedgerError, RunLedger, ScriptId, ScriptTarget};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SCRIPT_PREFIX: &str = "deploy_";
pub const SCRIPT_SUFFIX: &str = ".sh";

/// Errors from script discovery and resolution
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid script id: {0:?}")]
    InvalidId(String),
    #[error("script not found: {0}")]
    NotFound(ScriptId),
    #[error("script {0} resolves outside the deploy root")]
    OutsideRoot(ScriptId),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl RegistryError {
    /// True for every failure that means "no such script" to a client.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::InvalidId(_) | RegistryError::NotFound(_) | RegistryError::OutsideRoot(_)
        )
    }
}

/// Scripts available under one deploy root
#[derive(Debug, Clone)]
pub struct ScriptRegistry {
    root: PathBuf,
}

impl ScriptRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List every resolvable script, sorted by display name.
    ///
    /// A missing root is an empty registry.
    pub fn scan(&self) -> Result<Vec<ScriptTarget>, RegistryError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut targets = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(id) = file_name
                .to_str()
                .and_then(|name| name.strip_prefix(SCRIPT_PREFIX))
                .and_then(|rest| rest.strip_suffix(SCRIPT_SUFFIX))
            else {
                continue;
            };
            match self.resolve(&ScriptId::new(id)) {
                Ok(target) => targets.push(target),
                Err(e) if e.is_not_found() => {
                    tracing::debug!(file = ?file_name, error = %e, "skipping script");
                }
                Err(e) => return Err(e),
            }
        }
        targets.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(targets)
    }

    /// Scan the root and drop ledger entries for scripts that no longer exist.
    pub fn sync(&self, ledger: &dyn RunLedger) -> Result<Vec<ScriptTarget>, RegistryError> {
        let targets = self.scan()?;
        let present: HashSet<&ScriptId> = targets.iter().map(|t| &t.id).collect();
        let removed = ledger.retain(&|id: &ScriptId| present.contains(id))?;
        if removed > 0 {
            tracing::info!(removed, root = %self.root.display(), "removed records of deleted scripts");
        }
        Ok(targets)
    }

    /// Resolve `id` to an existing script inside the root.
    pub fn resolve(&self, id: &ScriptId) -> Result<ScriptTarget, RegistryError> {
        if !id.is_well_formed() {
            return Err(RegistryError::InvalidId(id.to_string()));
        }
        let not_found = |e: io::Error| match e.kind() {
            io::ErrorKind::NotFound => RegistryError::NotFound(id.clone()),
            _ => RegistryError::Io(e),
        };

        let root = self.root.canonicalize().map_err(not_found)?;
        let candidate = root.join(format!("{SCRIPT_PREFIX}{id}{SCRIPT_SUFFIX}"));
        let path = candidate.canonicalize().map_err(not_found)?;

        if !path.starts_with(&root) {
            tracing::warn!(
                script_id = %id,
                path = %path.display(),
                root = %root.display(),
                "script escapes the deploy root"
            );
            return Err(RegistryError::OutsideRoot(id.clone()));
        }
        if !path.is_file() {
            return Err(RegistryError::NotFound(id.clone()));
        }
        Ok(ScriptTarget::new(id.clone(), path))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
