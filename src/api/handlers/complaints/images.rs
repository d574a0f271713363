//! Image append and single-image removal endpoints.

use axum::{
    Json,
    extract::{Extension, Multipart, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::COMPLAINT_FOLDER;
use super::form::parse_complaint_form;
use super::owned_complaint;
use super::reconcile::{check_capacity, destroy_urls, upload_batch};
use super::storage::update_images;
use super::types::{ComplaintResponse, DeleteImageRequest, MessageResponse};
use crate::api::error::{ApiError, ErrorBody};
use crate::api::handlers::auth::gate::authorize_role;
use crate::api::handlers::auth::{Authenticator, RequestAuth, Role};
use crate::assets::AssetStore;

#[utoipa::path(
    post,
    path = "/v1/complaints/{id}/images",
    params(("id" = Uuid, Path, description = "Complaint id")),
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Images appended", body = ComplaintResponse),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Not the owner", body = ErrorBody),
        (status = 404, description = "No such complaint", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "complaints"
)]
pub async fn upload_images(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    authenticator: Extension<Arc<dyn Authenticator>>,
    store: Extension<Arc<dyn AssetStore>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let auth = RequestAuth::new(authenticator.0.clone());
    let principal = auth.principal(&headers, &pool).await?;
    authorize_role(principal, &[Role::User, Role::Admin])?;

    let mut complaint = owned_complaint(&pool, principal, id).await?;
    let form = parse_complaint_form(multipart).await?;

    check_capacity(complaint.images.len(), form.images.len())?;

    // Append path: new URLs join the stored set, nothing is ever deleted.
    let new_urls = upload_batch(store.0.as_ref(), COMPLAINT_FOLDER, form.images).await?;
    complaint.images.extend(new_urls);
    update_images(&pool, id, &complaint.images).await?;

    info!("Complaint images uploaded successfully");
    let body = ComplaintResponse {
        code: 201,
        message: "Complaint images uploaded successfully".to_string(),
        data: complaint.into(),
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

#[utoipa::path(
    delete,
    path = "/v1/complaints/{id}/images",
    params(("id" = Uuid, Path, description = "Complaint id")),
    request_body = DeleteImageRequest,
    responses(
        (status = 200, description = "Image removed", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Not the owner", body = ErrorBody),
        (status = 404, description = "No such complaint or image", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "complaints"
)]
pub async fn delete_image(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    authenticator: Extension<Arc<dyn Authenticator>>,
    store: Extension<Arc<dyn AssetStore>>,
    Path(id): Path<Uuid>,
    payload: Option<Json<DeleteImageRequest>>,
) -> Result<Response, ApiError> {
    let auth = RequestAuth::new(authenticator.0.clone());
    let principal = auth.principal(&headers, &pool).await?;
    authorize_role(principal, &[Role::User, Role::Admin])?;

    let complaint = owned_complaint(&pool, principal, id).await?;

    let Some(Json(request)) = payload else {
        return Err(ApiError::field("image", "The image field is required"));
    };

    if !complaint.images.contains(&request.image) {
        return Err(ApiError::NotFound("Complaint image"));
    }

    destroy_urls(store.0.as_ref(), std::slice::from_ref(&request.image)).await;

    let remaining: Vec<String> = complaint
        .images
        .into_iter()
        .filter(|image| image != &request.image)
        .collect();
    update_images(&pool, id, &remaining).await?;

    info!("Complaint image deleted successfully");
    let body = MessageResponse {
        code: 200,
        message: "Complaint image deleted successfully".to_string(),
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}
