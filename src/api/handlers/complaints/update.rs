//! Complaint update endpoint with replace-path image reconciliation.

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
use super::reconcile::{check_capacity, destroy_urls, replacement_plan, upload_batch};
use super::storage::update_complaint;
use super::types::ComplaintResponse;
use crate::api::error::{ApiError, ErrorBody};
use crate::api::handlers::auth::gate::authorize_role;
use crate::api::handlers::auth::{Authenticator, RequestAuth, Role};
use crate::assets::AssetStore;

#[utoipa::path(
    patch,
    path = "/v1/complaints/{id}",
    params(("id" = Uuid, Path, description = "Complaint id")),
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Complaint updated", body = ComplaintResponse),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Not the owner", body = ErrorBody),
        (status = 404, description = "No such complaint", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "complaints"
)]
pub async fn update(
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

    let complaint = owned_complaint(&pool, principal, id).await?;
    let form = parse_complaint_form(multipart).await?;

    // Submitted images entirely replace the stored set. Without images the
    // update touches fields only and the stored set survives untouched.
    let plan = if form.images.is_empty() {
        None
    } else {
        check_capacity(complaint.images.len(), form.images.len())?;
        let new_urls = upload_batch(store.0.as_ref(), COMPLAINT_FOLDER, form.images).await?;
        Some(replacement_plan(&complaint.images, new_urls))
    };

    if let Some(plan) = &plan {
        destroy_urls(store.0.as_ref(), &plan.to_delete).await;
    }

    let persisted = update_complaint(
        &pool,
        id,
        form.title.as_deref(),
        form.description.as_deref(),
        form.category_id,
        form.status.map(|status| status.as_str()),
        plan.as_ref().map(|plan| plan.final_urls.as_slice()),
    )
    .await;

    let record = match persisted {
        Ok(Some(record)) => record,
        // The new set was never persisted, so the fresh uploads are orphans.
        Ok(None) => {
            if let Some(plan) = &plan {
                destroy_urls(store.0.as_ref(), &plan.final_urls).await;
            }
            return Err(ApiError::NotFound("Complaint"));
        }
        Err(err) => {
            if let Some(plan) = &plan {
                destroy_urls(store.0.as_ref(), &plan.final_urls).await;
            }
            return Err(ApiError::Internal(err));
        }
    };

    info!("Complaint updated successfully");
    let body = ComplaintResponse {
        code: 200,
        message: "Complaint updated successfully".to_string(),
        data: record.into(),
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}
