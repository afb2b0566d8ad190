// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret file editor handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use dm_wire::{SecretContent, SecretEntry};
use tracing::info;

use super::{ApiError, ListenCtx, Operator};

pub(super) async fn list(State(ctx): State<Arc<ListenCtx>>) -> Result<Json<Vec<SecretEntry>>, ApiError> {
    let entries = ctx
        .vault
        .list()?
        .into_iter()
        .map(|f| SecretEntry::new(f.name, f.size, f.modified_ms, f.extension))
        .collect();
    Ok(Json(entries))
}

pub(super) async fn read(
    State(ctx): State<Arc<ListenCtx>>,
    Path(name): Path<String>,
) -> Result<Json<SecretContent>, ApiError> {
    let content = ctx.vault.read(&name)?;
    let name = dm_storage::base_name(&name)?;
    Ok(Json(SecretContent { name, content }))
}

pub(super) async fn write(
    State(ctx): State<Arc<ListenCtx>>,
    Path(name): Path<String>,
    Operator(actor): Operator,
    body: String,
) -> Result<StatusCode, ApiError> {
    ctx.vault.write(&name, &body)?;
    info!(%name, %actor, bytes = body.len(), "secret file updated");
    Ok(StatusCode::NO_CONTENT)
}
