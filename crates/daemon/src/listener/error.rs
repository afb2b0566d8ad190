// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type shared by all HTTP handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dm_storage::{RegistryError, SecretError};
use dm_wire::ErrorBody;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Registry(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Secret(SecretError::NotFound(_) | SecretError::RootMissing(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Secret(SecretError::InvalidName(_) | SecretError::ExtensionNotAllowed(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Registry(_) | ApiError::Secret(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
