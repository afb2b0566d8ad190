// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors raised while supervising a script process.

use dm_core::OutputStream;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from starting or observing a supervised process
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to start {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is not an executable file", path.display())]
    NotExecutable { path: PathBuf },
    #[error("child {0} was not captured")]
    MissingPipe(OutputStream),
    #[error("failed to read child {stream}: {source}")]
    StreamRead {
        stream: OutputStream,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait on child: {0}")]
    Wait(#[source] io::Error),
}

impl SupervisorError {
    /// True when the process never started.
    pub fn is_spawn(&self) -> bool {
        matches!(self, SupervisorError::Spawn { .. } | SupervisorError::NotExecutable { .. })
    }
}
