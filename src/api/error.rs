//! Boundary error taxonomy and the JSON error body.
//!
//! Every failure surfaced to a client goes through [`ApiError`], which maps
//! to `{code, message, errors?}`. Only `Validation` carries the per-field
//! map. `Internal` logs the original error server-side and returns a generic
//! message, never the underlying detail.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;

/// field -> messages, camelCase field names as the client expects.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// 401. Message distinguishes missing vs expired vs invalid token and
    /// nothing more.
    #[error("{0}")]
    Unauthenticated(String),
    /// 403. Deliberately generic; never names the failed rule.
    #[error("Permission denied")]
    Forbidden,
    /// 404 with the entity type, e.g. "Complaint not found".
    #[error("{0} not found")]
    NotFound(&'static str),
    /// 400 with structured per-field messages.
    #[error("Validation errors")]
    Validation(FieldErrors),
    /// 500. Logged in full, surfaced as "Internal server error".
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Validation failure on a single field.
    #[must_use]
    pub fn field(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        Self::Validation(errors)
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Internal(err) => {
                error!("Internal server error: {err:?}");
                ErrorBody {
                    code: status.as_u16(),
                    message: "Internal server error".to_string(),
                    errors: None,
                }
            }
            Self::Validation(errors) => {
                warn!("Validation failed: {errors:?}");
                ErrorBody {
                    code: status.as_u16(),
                    message: "Validation errors".to_string(),
                    errors: Some(errors),
                }
            }
            other => {
                warn!("{other}");
                ErrorBody {
                    code: status.as_u16(),
                    message: other.to_string(),
                    errors: None,
                }
            }
        };
        (status, Json(body)).into_response()
    }
}
