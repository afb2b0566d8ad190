// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File logging for the daemon.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::lifecycle::LifecycleError;

/// Install the global subscriber writing to `log_path`.
///
/// `RUST_LOG` overrides the default `info` filter. Keep the returned guard
/// alive for as long as logs should be flushed.
pub fn init(log_path: &Path) -> Result<WorkerGuard, LifecycleError> {
    let dir = log_path
        .parent()
        .ok_or_else(|| LifecycleError::Logging(format!("no parent for {}", log_path.display())))?;
    let file = log_path
        .file_name()
        .ok_or_else(|| LifecycleError::Logging(format!("no file name in {}", log_path.display())))?;
    std::fs::create_dir_all(dir)?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file));
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| LifecycleError::Logging(e.to_string()))?;
    Ok(guard)
}
