// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP listener for the dashboard.
//!
//! Every route except `/health` passes the bearer-token check when an
//! auth token is configured. Handlers share one [`ListenCtx`].

mod auth;
mod error;
mod runs;
mod scripts;
mod secrets;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use dm_core::RunLedger;
use dm_engine::ScriptRunner;
use dm_storage::{ScriptRegistry, SecretVault};
use dm_wire::Health;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use auth::{Operator, OPERATOR_HEADER};
pub use error::ApiError;

/// Shared daemon context for all request handlers.
pub struct ListenCtx {
    pub runner: Arc<ScriptRunner>,
    pub ledger: Arc<dyn RunLedger>,
    pub registry: ScriptRegistry,
    pub vault: SecretVault,
    /// When set, requests must carry `Authorization: Bearer <token>`.
    pub auth_token: Option<String>,
}

/// Build the dashboard router.
pub fn router(ctx: Arc<ListenCtx>) -> Router {
    Router::new()
        .route("/stream/{id}", get(runs::stream))
        .route("/run/{id}", post(runs::run))
        .route("/scripts", get(scripts::list))
        .route("/scripts/{id}", get(scripts::show))
        .route("/summary", get(scripts::summary))
        .route("/secrets", get(secrets::list))
        .route("/secrets/{name}", get(secrets::read).put(secrets::write))
        .route_layer(middleware::from_fn_with_state(Arc::clone(&ctx), auth::require_token))
        .route("/health", get(health))
        .with_state(ctx)
}

async fn health() -> Json<Health> {
    Json(Health::ok())
}

/// Serves the router on a bound TCP socket.
pub struct Listener {
    tcp: TcpListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn new(tcp: TcpListener, ctx: Arc<ListenCtx>) -> Self {
        Self { tcp, ctx }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.tcp.local_addr()
    }

    /// Serve until `shutdown` is cancelled and open connections finish.
    pub async fn run(self, shutdown: CancellationToken) -> std::io::Result<()> {
        let addr = self.tcp.local_addr()?;
        info!(%addr, auth = self.ctx.auth_token.is_some(), "listening");
        axum::serve(self.tcp, router(self.ctx))
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
