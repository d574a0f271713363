//! Complaint creation endpoint.

use axum::{
    Json,
    extract::{Extension, Multipart},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::COMPLAINT_FOLDER;
use super::form::parse_complaint_form;
use super::reconcile::{check_capacity, destroy_urls, upload_batch};
use super::storage::insert_complaint;
use super::types::{ComplaintResponse, ComplaintStatus};
use crate::api::error::{ApiError, ErrorBody, FieldErrors};
use crate::api::handlers::auth::gate::authorize_role;
use crate::api::handlers::auth::{Authenticator, RequestAuth, Role};
use crate::assets::AssetStore;

#[utoipa::path(
    post,
    path = "/v1/complaints",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Complaint created", body = ComplaintResponse),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "complaints"
)]
pub async fn create(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    authenticator: Extension<Arc<dyn Authenticator>>,
    store: Extension<Arc<dyn AssetStore>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let auth = RequestAuth::new(authenticator.0.clone());
    let principal = auth.principal(&headers, &pool).await?;
    authorize_role(principal, &[Role::User, Role::Admin])?;

    let form = parse_complaint_form(multipart).await?;

    let mut errors = FieldErrors::new();
    if form
        .title
        .as_deref()
        .map_or(true, |title| title.trim().is_empty())
    {
        errors.insert(
            "title".to_string(),
            vec!["The title field is required".to_string()],
        );
    }
    if form
        .description
        .as_deref()
        .map_or(true, |description| description.trim().is_empty())
    {
        errors.insert(
            "description".to_string(),
            vec!["The description field is required".to_string()],
        );
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    check_capacity(0, form.images.len())?;
    let image_urls = upload_batch(store.0.as_ref(), COMPLAINT_FOLDER, form.images).await?;

    let status = form.status.unwrap_or(ComplaintStatus::Pending);
    let record = match insert_complaint(
        &pool,
        principal.id,
        form.title.as_deref().unwrap_or_default(),
        form.description.as_deref().unwrap_or_default(),
        form.category_id,
        status.as_str(),
        &image_urls,
    )
    .await
    {
        Ok(record) => record,
        Err(err) => {
            // The row never existed, so the stored assets are orphans.
            destroy_urls(store.0.as_ref(), &image_urls).await;
            return Err(ApiError::Internal(err));
        }
    };

    info!("Complaint created successfully");
    let body = ComplaintResponse {
        code: 201,
        message: "Complaint created successfully".to_string(),
        data: record.into(),
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}
