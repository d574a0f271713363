//! User detail and self-service profile endpoints.

use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::gate::{authorize_ownership, authorize_role};
use super::auth::storage::{lookup_user_by_id, update_user_profile};
use super::auth::types::UserData;
use super::auth::{Authenticator, RequestAuth, Role};
use crate::api::error::{ApiError, ErrorBody, FieldErrors};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub code: u16,
    pub message: String,
    pub data: UserData,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub avatar: Option<String>,
}

#[utoipa::path(
    get,
    path = "/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User detail", body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Not the requested user", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "users"
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
    authorize_ownership(principal, id)?;

    let user = lookup_user_by_id(&pool, id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    info!("User retrieved successfully");
    let body = UserResponse {
        code: 200,
        message: "User retrieved successfully".to_string(),
        data: UserData {
            id: user.id,
            username: user.username,
            email: user.email,
            avatar: user.avatar,
            role: user.role,
            token: None,
        },
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}

#[utoipa::path(
    patch,
    path = "/v1/users/{id}/profile",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Not the requested user", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn update_profile(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    authenticator: Extension<Arc<dyn Authenticator>>,
    Path(id): Path<Uuid>,
    payload: Option<Json<UpdateProfileRequest>>,
) -> Result<Response, ApiError> {
    let auth = RequestAuth::new(authenticator.0.clone());
    let principal = auth.principal(&headers, &pool).await?;
    authorize_role(principal, &[Role::User, Role::Admin])?;
    authorize_ownership(principal, id)?;

    let Some(Json(request)) = payload else {
        return Err(ApiError::field("username", "Nothing to update"));
    };
    validate(&request)?;

    let user = update_user_profile(
        &pool,
        id,
        request.username.as_deref().map(str::trim),
        request.avatar.as_deref().map(str::trim),
    )
    .await?
    .ok_or(ApiError::NotFound("User"))?;

    info!("Profile updated successfully");
    let body = UserResponse {
        code: 200,
        message: "Profile updated successfully".to_string(),
        data: UserData {
            id: user.id,
            username: user.username,
            email: user.email,
            avatar: user.avatar,
            role: user.role,
            token: None,
        },
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}

fn validate(request: &UpdateProfileRequest) -> Result<(), ApiError> {
    let mut errors = FieldErrors::new();
    if request.username.is_none() && request.avatar.is_none() {
        errors.insert(
            "username".to_string(),
            vec!["Nothing to update".to_string()],
        );
    }
    if let Some(username) = request.username.as_deref() {
        if username.trim().is_empty() {
            errors.insert(
                "username".to_string(),
                vec!["The username field is required".to_string()],
            );
        }
    }
    if let Some(avatar) = request.avatar.as_deref() {
        if avatar.trim().is_empty() {
            errors.insert(
                "avatar".to_string(),
                vec!["The avatar field is required".to_string()],
            );
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_update_is_rejected() {
        let result = validate(&UpdateProfileRequest {
            username: None,
            avatar: None,
        });
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn blank_fields_are_rejected() {
        let result = validate(&UpdateProfileRequest {
            username: Some("  ".to_string()),
            avatar: None,
        });
        let Err(ApiError::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert!(errors.contains_key("username"));
    }

    #[test]
    fn partial_update_passes() {
        assert!(
            validate(&UpdateProfileRequest {
                username: Some("citizen".to_string()),
                avatar: None,
            })
            .is_ok()
        );
    }
}
