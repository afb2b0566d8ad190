// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Whole-file access to small configuration secrets.
//!
//! Names are reduced to their base name before being joined to the root,
//! and only an allow-list of text extensions can be read or written. The
//! vault edits existing files; it never creates new ones.

use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Lower-case extensions (without the dot) the vault will touch.
pub const ALLOWED_EXTENSIONS: &[&str] = &["env", "conf", "ini", "txt", "yaml", "yml", "json"];

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret directory {} does not exist", .0.display())]
    RootMissing(PathBuf),
    #[error("invalid secret name: {0:?}")]
    InvalidName(String),
    #[error("file type not allowed: {0:?}")]
    ExtensionNotAllowed(String),
    #[error("secret not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Listing entry for one file in the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretFile {
    pub name: String,
    pub size: u64,
    pub modified_ms: i64,
    /// Lower-case, without the dot; empty when the file has none.
    pub extension: String,
}

#[derive(Debug, Clone)]
pub struct SecretVault {
    root: PathBuf,
}

impl SecretVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Non-hidden regular files in the root, sorted by name.
    pub fn list(&self) -> Result<Vec<SecretFile>, SecretError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SecretError::RootMissing(self.root.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let modified_ms =
                meta.modified().map(|t| DateTime::<Utc>::from(t).timestamp_millis()).unwrap_or(0);
            files.push(SecretFile {
                extension: extension_of(&name),
                name,
                size: meta.len(),
                modified_ms,
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    pub fn read(&self, name: &str) -> Result<String, SecretError> {
        let (name, path) = self.locate(name)?;
        tracing::debug!(secret = %name, "reading secret");
        Ok(std::fs::read_to_string(path)?)
    }

    /// Replace the whole content of an existing secret file.
    pub fn write(&self, name: &str, content: &str) -> Result<(), SecretError> {
        let (name, path) = self.locate(name)?;
        std::fs::write(&path, content)?;
        tracing::info!(secret = %name, bytes = content.len(), "secret updated");
        Ok(())
    }

    fn locate(&self, name: &str) -> Result<(String, PathBuf), SecretError> {
        let base = base_name(name)?;
        let ext = extension_of(&base);
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(SecretError::ExtensionNotAllowed(base));
        }
        if !self.root.is_dir() {
            return Err(SecretError::RootMissing(self.root.clone()));
        }
        let path = self.root.join(&base);
        if !path.is_file() {
            return Err(SecretError::NotFound(base));
        }
        Ok((base, path))
    }
}

/// Reduce a client-supplied name to the final path component the vault
/// actually serves.
pub fn base_name(name: &str) -> Result<String, SecretError> {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SecretError::InvalidName(name.to_string()))
}

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;
