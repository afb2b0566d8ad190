// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script identity and resolved execution targets.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Opaque identifier of a deploy script.
///
/// Well-formed ids are non-empty and contain only ASCII alphanumerics,
/// `_`, and `-`, so they can never name a path component like `..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptId(String);

impl ScriptId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self.0.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }

    /// Human-friendly label: underscores become spaces, words are title-cased.
    /// A letter is capitalised whenever it follows a non-letter, so dashes and
    /// digits start a new word too.
    ///
    /// `api_server` → `Api Server`, `db-backup` → `Db-Backup`
    pub fn display_name(&self) -> String {
        self.0
            .split(['_', ' '])
            .filter(|w| !w.is_empty())
            .map(title_case)
            .collect::<Vec<String>>()
            .join(" ")
    }
}

fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut after_letter = false;
    for c in word.chars() {
        if after_letter {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        after_letter = c.is_alphabetic();
    }
    out
}

impl std::fmt::Display for ScriptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScriptId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ScriptId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A script resolved to an existing executable inside the deploy root.
///
/// Only the registry constructs these for live runs; the path is already
/// canonical and confined to the root when a supervisor sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptTarget {
    pub id: ScriptId,
    pub name: String,
    pub path: PathBuf,
}

impl ScriptTarget {
    pub fn new(id: ScriptId, path: impl Into<PathBuf>) -> Self {
        let name = id.display_name();
        Self { id, name, path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Identity of the operator who triggered a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(String);

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::new("anonymous")
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
