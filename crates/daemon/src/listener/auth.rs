// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token gate and operator identity.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use dm_core::Actor;

use super::{ApiError, ListenCtx};

/// Header carrying the operator name set by the fronting proxy.
pub const OPERATOR_HEADER: &str = "x-operator";

pub(super) async fn require_token(
    State(ctx): State<Arc<ListenCtx>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = ctx.auth_token.as_deref() {
        let provided = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if provided != Some(expected) {
            return Err(ApiError::Unauthorized);
        }
    }
    Ok(next.run(req).await)
}

/// The operator running a request, `anonymous` when unnamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator(pub Actor);

impl<S: Send + Sync> FromRequestParts<S> for Operator {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(OPERATOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(Actor::new)
            .unwrap_or_default();
        Ok(Operator(actor))
    }
}
