// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use dm_core::ScriptId;
use dm_wire::{DashboardSummary, ScriptView};

use super::{ApiError, ListenCtx};

/// Every deploy script with its latest run. Syncs the registry first.
pub(super) async fn list(State(ctx): State<Arc<ListenCtx>>) -> Result<Json<Vec<ScriptView>>, ApiError> {
    let targets = ctx.registry.sync(ctx.ledger.as_ref())?;
    let views = targets
        .iter()
        .map(|target| ScriptView::new(target, ctx.ledger.latest(&target.id).as_ref()))
        .collect();
    Ok(Json(views))
}

pub(super) async fn show(
    State(ctx): State<Arc<ListenCtx>>,
    Path(id): Path<String>,
) -> Result<Json<ScriptView>, ApiError> {
    let target = ctx.registry.resolve(&ScriptId::new(id))?;
    let latest = ctx.ledger.latest(&target.id);
    Ok(Json(ScriptView::new(&target, latest.as_ref())))
}

pub(super) async fn summary(State(ctx): State<Arc<ListenCtx>>) -> Result<Json<DashboardSummary>, ApiError> {
    let targets = ctx.registry.sync(ctx.ledger.as_ref())?;
    let records = ctx.ledger.all();
    Ok(Json(DashboardSummary::compute(&targets, &records)))
}
