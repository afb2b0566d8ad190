// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::io::Write;
use std::sync::Arc;

use dm_core::{RunLedger, SystemClock};
use dm_engine::ScriptRunner;
use dm_storage::{RunStore, ScriptRegistry, SecretVault};
use fs2::FileExt;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::{Config, DaemonState, LifecycleError, StartupResult};
use crate::listener::ListenCtx;

/// Start the daemon
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // A failed lock means the files belong to the running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    // 1. Create state directory
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents two daemons sharing one ledger.
    // Open without truncating so a failed attempt keeps the owner's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Open the run ledger
    let store = Arc::new(RunStore::open(&config.ledger_path)?);
    info!(path = %config.ledger_path.display(), runs = store.all().len(), "loaded run ledger");

    // 4. Sync the registry so records of deleted scripts are dropped
    let registry = ScriptRegistry::new(&config.deploy_dir);
    match registry.sync(store.as_ref()) {
        Ok(targets) => {
            info!(root = %config.deploy_dir.display(), scripts = targets.len(), "script registry synced")
        }
        Err(e) => warn!(root = %config.deploy_dir.display(), error = %e, "script registry sync failed"),
    }
    if config.runner.elevate.is_empty() {
        warn!("privilege elevation disabled, scripts run as the daemon user");
    }

    let ledger: Arc<dyn RunLedger> = store;
    let runner = ScriptRunner::new(Arc::clone(&ledger), config.runner.clone(), SystemClock);
    let ctx = Arc::new(ListenCtx {
        runner: Arc::new(runner),
        ledger,
        registry,
        vault: SecretVault::new(&config.secret_dir),
        auth_token: config.auth_token.clone(),
    });

    // 5. Bind (LAST - only after all validation passes)
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .map_err(|e| LifecycleError::BindFailed(config.listen_addr, e))?;

    Ok(StartupResult {
        daemon: DaemonState { config: config.clone(), lock_file, ctx },
        listener,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.lock_path.exists() {
        if let Err(e) = std::fs::remove_file(&config.lock_path) {
            warn!(error = %e, "failed to remove PID file during cleanup");
        }
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
