//! Complaint endpoints and the bounded image-set reconciliation they share.
//!
//! Every mutation is gated by role and ownership checks against freshly
//! loaded rows. Image handling always runs capacity check, then uploads,
//! then destruction of displaced assets, then persistence.

use sqlx::PgPool;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::handlers::auth::Principal;
use crate::api::handlers::auth::gate::authorize_ownership;

pub(crate) mod create;
pub(crate) mod detail;
pub(crate) mod form;
pub(crate) mod images;
pub(crate) mod reconcile;
pub(crate) mod storage;
pub(crate) mod types;
pub(crate) mod update;

use storage::{ComplaintRecord, lookup_complaint};
use types::ComplaintData;

/// Asset-store folder holding complaint images.
pub(crate) const COMPLAINT_FOLDER: &str = "complaints";

/// Load a complaint and enforce ownership in one step. Missing rows are a
/// 404; rows owned by someone else are a 403 for non-admins.
pub(crate) async fn owned_complaint(
    pool: &PgPool,
    principal: &Principal,
    id: Uuid,
) -> Result<ComplaintRecord, ApiError> {
    let complaint = lookup_complaint(pool, id)
        .await?
        .ok_or(ApiError::NotFound("Complaint"))?;
    authorize_ownership(principal, complaint.user_id)?;
    Ok(complaint)
}

impl From<ComplaintRecord> for ComplaintData {
    fn from(record: ComplaintRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            category_id: record.category_id,
            title: record.title,
            description: record.description,
            status: record.status,
            images: record.images,
        }
    }
}
