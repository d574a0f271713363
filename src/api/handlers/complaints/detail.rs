//! Complaint show and delete endpoints.

use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::owned_complaint;
use super::reconcile::destroy_urls;
use super::storage::delete_complaint;
use super::types::{ComplaintResponse, MessageResponse};
use crate::api::error::{ApiError, ErrorBody};
use crate::api::handlers::auth::gate::authorize_role;
use crate::api::handlers::auth::{Authenticator, RequestAuth, Role};
use crate::assets::AssetStore;

#[utoipa::path(
    get,
    path = "/v1/complaints/{id}",
    params(("id" = Uuid, Path, description = "Complaint id")),
    responses(
        (status = 200, description = "Complaint detail", body = ComplaintResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Not the owner", body = ErrorBody),
        (status = 404, description = "No such complaint", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "complaints"
)]
pub async fn show(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    authenticator: Extension<Arc<dyn Authenticator>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let auth = RequestAuth::new(authenticator.0.clone());
    let principal = auth.principal(&headers, &pool).await?;
    authorize_role(principal, &[Role::User, Role::Admin])?;

    let complaint = owned_complaint(&pool, principal, id).await?;

    info!("Complaint retrieved successfully");
    let body = ComplaintResponse {
        code: 200,
        message: "Complaint retrieved successfully".to_string(),
        data: complaint.into(),
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}

#[utoipa::path(
    delete,
    path = "/v1/complaints/{id}",
    params(("id" = Uuid, Path, description = "Complaint id")),
    responses(
        (status = 200, description = "Complaint and its images deleted", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Not the owner", body = ErrorBody),
        (status = 404, description = "No such complaint", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "complaints"
)]
pub async fn delete(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    authenticator: Extension<Arc<dyn Authenticator>>,
    store: Extension<Arc<dyn AssetStore>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let auth = RequestAuth::new(authenticator.0.clone());
    let principal = auth.principal(&headers, &pool).await?;
    authorize_role(principal, &[Role::User, Role::Admin])?;

    let complaint = owned_complaint(&pool, principal, id).await?;

    destroy_urls(store.0.as_ref(), &complaint.images).await;
    delete_complaint(&pool, id).await?;

    info!("Complaint deleted successfully");
    let body = MessageResponse {
        code: 200,
        message: "Complaint deleted successfully".to_string(),
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}
