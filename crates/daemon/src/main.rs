// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dmd: the deploy manager daemon.

use std::process::ExitCode;
use std::sync::Arc;

use dm_daemon::lifecycle::{self, Config, LifecycleError};
use dm_daemon::listener::Listener;
use dm_daemon::logging;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("dmd: {e}");
            error!(error = %e, "daemon exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), LifecycleError> {
    let config = Config::load()?;
    let _guard = logging::init(&config.log_path)?;
    info!(
        pid = std::process::id(),
        state_dir = %config.state_dir.display(),
        deploy_dir = %config.deploy_dir.display(),
        "starting daemon"
    );

    let lifecycle::StartupResult { mut daemon, listener } = lifecycle::startup(&config).await?;
    let shutdown = CancellationToken::new();
    let mut sigterm = signal(SignalKind::terminate())?;
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
            _ = sigterm.recv() => info!("received SIGTERM"),
        }
        trigger.cancel();
    });

    let served = Listener::new(listener, Arc::clone(&daemon.ctx)).run(shutdown).await;
    if let Err(e) = &served {
        error!(error = %e, "listener failed");
    }
    daemon.shutdown()?;
    served.map_err(LifecycleError::Io)
}
