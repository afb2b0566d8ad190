// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.
//!
//! Only [`crate::lifecycle::Config::load`] calls into this module; every
//! other component receives plain values at construction time.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

pub const DEFAULT_DEPLOY_DIR: &str = "/opt/deploy";
pub const DEFAULT_SECRET_DIR: &str = "/opt/secret";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_ELEVATE: &str = "/usr/bin/sudo -n";

/// Resolve state directory: DM_STATE_DIR > XDG_STATE_HOME/dm > ~/.local/state/dm
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("DM_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("dm"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/dm"))
}

/// Directory holding `deploy_<id>.sh` scripts
pub fn deploy_dir() -> PathBuf {
    std::env::var("DM_DEPLOY_DIR").map(PathBuf::from).unwrap_or_else(|_| DEFAULT_DEPLOY_DIR.into())
}

/// Directory the secret editor works in
pub fn secret_dir() -> PathBuf {
    std::env::var("DM_SECRET_DIR").map(PathBuf::from).unwrap_or_else(|_| DEFAULT_SECRET_DIR.into())
}

pub fn listen_addr() -> Result<SocketAddr, LifecycleError> {
    let value = std::env::var("DM_LISTEN_ADDR").unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
    value
        .parse()
        .map_err(|_| LifecycleError::InvalidEnv { var: "DM_LISTEN_ADDR", value })
}

/// Budget for streamed runs (default 300s)
pub fn stream_timeout() -> Result<Duration, LifecycleError> {
    duration("DM_STREAM_TIMEOUT_SECS", Duration::from_secs, Duration::from_secs(300))
}

/// Budget for blocking runs (default 1800s)
pub fn run_timeout() -> Result<Duration, LifecycleError> {
    duration("DM_RUN_TIMEOUT_SECS", Duration::from_secs, Duration::from_secs(1800))
}

/// Sleep between supervisor polls (default 100ms, must be non-zero)
pub fn poll_interval() -> Result<Duration, LifecycleError> {
    let interval = duration("DM_POLL_INTERVAL_MS", Duration::from_millis, Duration::from_millis(100))?;
    if interval.is_zero() {
        let value = std::env::var("DM_POLL_INTERVAL_MS").unwrap_or_default();
        return Err(LifecycleError::InvalidEnv { var: "DM_POLL_INTERVAL_MS", value });
    }
    Ok(interval)
}

/// Grace between SIGTERM and SIGKILL when killing a run
pub fn kill_grace() -> Result<Duration, LifecycleError> {
    duration("DM_KILL_GRACE_MS", Duration::from_millis, Duration::from_secs(2))
}

/// Privilege-elevation prefix. Set `DM_ELEVATE=""` to run scripts directly.
pub fn elevate() -> Vec<String> {
    std::env::var("DM_ELEVATE")
        .unwrap_or_else(|_| DEFAULT_ELEVATE.to_string())
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Bearer token required on every request except `/health`.
pub fn auth_token() -> Option<String> {
    std::env::var("DM_AUTH_TOKEN").ok().filter(|s| !s.is_empty())
}

/// Unset falls back to `default`; anything but a whole number is an error.
fn duration(
    var: &'static str,
    unit: fn(u64) -> Duration,
    default: Duration,
) -> Result<Duration, LifecycleError> {
    match std::env::var(var) {
        Ok(value) => match value.trim().parse::<u64>() {
            Ok(n) => Ok(unit(n)),
            Err(_) => Err(LifecycleError::InvalidEnv { var, value }),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
