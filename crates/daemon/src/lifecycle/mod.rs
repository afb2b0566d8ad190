// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: configuration, startup, shutdown.

mod startup;
pub use startup::startup;

use std::fs::File;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use dm_engine::RunnerConfig;
use dm_storage::StoreError;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::env;
use crate::listener::ListenCtx;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/dm)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the run ledger
    pub ledger_path: PathBuf,
    /// Directory scanned for deploy scripts
    pub deploy_dir: PathBuf,
    /// Directory served by the secret editor
    pub secret_dir: PathBuf,
    pub listen_addr: SocketAddr,
    pub auth_token: Option<String>,
    pub runner: RunnerConfig,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        let runner = RunnerConfig::default()
            .stream_timeout(env::stream_timeout()?)
            .run_timeout(env::run_timeout()?)
            .poll_interval(env::poll_interval()?)
            .kill_grace(env::kill_grace()?)
            .elevate(env::elevate());

        let mut config = Self::for_state_dir(env::state_dir()?, env::listen_addr()?, runner);
        config.deploy_dir = env::deploy_dir();
        config.secret_dir = env::secret_dir();
        config.auth_token = env::auth_token();
        Ok(config)
    }

    /// Configuration with every state path under `state_dir` and default
    /// script and secret roots.
    pub fn for_state_dir(state_dir: PathBuf, listen_addr: SocketAddr, runner: RunnerConfig) -> Self {
        Self {
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            ledger_path: state_dir.join("runs.json"),
            deploy_dir: PathBuf::from(env::DEFAULT_DEPLOY_DIR),
            secret_dir: PathBuf::from(env::DEFAULT_SECRET_DIR),
            listen_addr,
            auth_token: None,
            runner,
            state_dir,
        }
    }
}

/// Daemon state during operation.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Shared with every request handler
    pub ctx: Arc<ListenCtx>,
}

/// Result of daemon startup: the daemon state plus the bound listener.
pub struct StartupResult {
    pub daemon: DaemonState,
    pub listener: TcpListener,
}

impl DaemonState {
    /// Shutdown the daemon gracefully.
    ///
    /// Streams still open were drained by the listener. Detached blocking
    /// runs are not waited for; their supervisors kill the process groups
    /// when the runtime drops them.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("shutting down daemon");

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!(error = %e, "failed to remove PID file");
            }
        }

        // Lock is released when self.lock_file is dropped
        info!("daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    #[error("Run ledger error: {0}")]
    Store(#[from] StoreError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
