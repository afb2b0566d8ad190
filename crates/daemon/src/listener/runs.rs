// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run handlers: the live stream and the blocking run.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::Response;
use axum::Json;
use dm_core::ScriptId;
use dm_wire::{RunView, ScriptView};
use futures_util::stream::unfold;
use tracing::info;

use super::{ApiError, ListenCtx, Operator};

pub(super) async fn stream(
    State(ctx): State<Arc<ListenCtx>>,
    Path(id): Path<String>,
    Operator(actor): Operator,
) -> Result<Response, ApiError> {
    // Unknown scripts are rejected before anything is spawned or recorded.
    let target = ctx.registry.resolve(&ScriptId::new(id))?;
    info!(script_id = %target.id, %actor, "stream requested");

    let events = ctx.runner.spawn_stream(target, actor);
    let frames = unfold(events, |mut events| async move {
        let event = events.recv().await?;
        Some((Ok::<_, Infallible>(dm_wire::encode(&event)), events))
    });

    Response::builder()
        .header(CONTENT_TYPE, dm_wire::CONTENT_TYPE)
        .header(CACHE_CONTROL, "no-cache")
        .header("x-accel-buffering", "no")
        .body(Body::from_stream(frames))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

pub(super) async fn run(
    State(ctx): State<Arc<ListenCtx>>,
    Path(id): Path<String>,
    Operator(actor): Operator,
) -> Result<Json<RunView>, ApiError> {
    let target = ctx.registry.resolve(&ScriptId::new(id))?;
    info!(script_id = %target.id, %actor, "blocking run requested");

    // Detached so a dropped request still lets the run finish and record.
    let runner = Arc::clone(&ctx.runner);
    let job = target.clone();
    let outcome = tokio::spawn(async move { runner.run(job, actor).await })
        .await
        .map_err(|e| ApiError::Internal(format!("run task failed: {e}")))?;

    Ok(Json(RunView {
        script: ScriptView::new(&target, Some(&outcome.record)),
        stdout: outcome.stdout,
        stderr: outcome.stderr,
    }))
}
