//! Credential sign-in endpoint.

use anyhow::Context;
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

use super::session::refresh_cookie;
use super::state::AuthState;
use super::storage::{UserRecord, insert_refresh_token, lookup_user_by_email};
use super::types::{SigninRequest, SigninResponse, UserData};
use crate::api::error::{ApiError, ErrorBody, FieldErrors};
use crate::token::unix_now;

const MSG_BAD_CREDENTIALS: &str = "Email or password is invalid";

#[utoipa::path(
    post,
    path = "/v1/auth/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Signed in, refresh cookie set", body = SigninResponse),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 401, description = "Unknown email or wrong password", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn signin(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SigninRequest>>,
) -> Result<Response, ApiError> {
    let request = match payload {
        Some(Json(payload)) => payload,
        None => {
            return Err(ApiError::Validation(missing_payload_errors()));
        }
    };
    validate(&request)?;

    let user = lookup_user_by_email(&pool, request.email.trim())
        .await?
        .ok_or_else(|| ApiError::Unauthenticated(MSG_BAD_CREDENTIALS.to_string()))?;

    if !password_matches(&user, &request.password) {
        return Err(ApiError::Unauthenticated(MSG_BAD_CREDENTIALS.to_string()));
    }

    let now = unix_now();
    let keys = auth_state.keys();
    let access_token = keys
        .issue_access(user.id, &user.role, None, now)
        .context("failed to issue access token")?;
    let (raw_refresh, expires_at) = keys
        .issue_refresh(user.id, &user.role, now)
        .context("failed to issue refresh token")?;

    insert_refresh_token(&pool, user.id, &raw_refresh, expires_at).await?;

    let body = SigninResponse {
        code: 200,
        message: "Signed in successfully".to_string(),
        data: UserData {
            id: user.id,
            username: user.username,
            email: user.email,
            avatar: user.avatar,
            role: user.role,
            token: Some(access_token),
        },
    };

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        SET_COOKIE,
        refresh_cookie(&auth_state, &raw_refresh).context("failed to build refresh cookie")?,
    );

    info!("Signed in successfully");
    Ok((StatusCode::OK, response_headers, Json(body)).into_response())
}

fn missing_payload_errors() -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.insert(
        "email".to_string(),
        vec!["The email field is required".to_string()],
    );
    errors.insert(
        "password".to_string(),
        vec!["The password field is required".to_string()],
    );
    errors
}

fn valid_email(email: &str) -> bool {
    regex::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

fn validate(request: &SigninRequest) -> Result<(), ApiError> {
    let mut errors = FieldErrors::new();
    let email = request.email.trim();
    if email.is_empty() {
        errors.insert(
            "email".to_string(),
            vec!["The email field is required".to_string()],
        );
    } else if !valid_email(email) {
        errors.insert(
            "email".to_string(),
            vec!["The email must be a valid email address".to_string()],
        );
    }
    if request.password.is_empty() {
        errors.insert(
            "password".to_string(),
            vec!["The password field is required".to_string()],
        );
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

/// Constant-shape credential check. Users provisioned without a password
/// (external identity only) can never pass a password sign-in.
fn password_matches(user: &UserRecord, password: &str) -> bool {
    let Some(stored) = user.password_hash.as_deref() else {
        return false;
    };
    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("Unparseable password hash for user {}: {err}", user.id);
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::PasswordHasher;
    use argon2::password_hash::SaltString;
    use uuid::Uuid;

    fn user_with_hash(password_hash: Option<String>) -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            avatar: String::new(),
            role: "user".to_string(),
            password_hash,
        }
    }

    fn hash(password: &str) -> String {
        let salt = SaltString::from_b64("c2FsdHNhbHRzYWx0").expect("valid salt");
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .expect("hashing succeeds")
            .to_string()
    }

    #[test]
    fn validation_collects_field_errors() {
        let result = validate(&SigninRequest {
            email: String::new(),
            password: String::new(),
        });
        let Err(ApiError::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("password"));
    }

    #[test]
    fn validation_rejects_malformed_email() {
        let result = validate(&SigninRequest {
            email: "not-an-email".to_string(),
            password: "secret".to_string(),
        });
        let Err(ApiError::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert!(errors.contains_key("email"));
        assert!(!errors.contains_key("password"));
    }

    #[test]
    fn validation_passes_well_formed_input() {
        assert!(
            validate(&SigninRequest {
                email: "alice@example.com".to_string(),
                password: "secret".to_string(),
            })
            .is_ok()
        );
    }

    #[test]
    fn correct_password_matches() {
        let user = user_with_hash(Some(hash("hunter2hunter2")));
        assert!(password_matches(&user, "hunter2hunter2"));
    }

    #[test]
    fn wrong_password_does_not_match() {
        let user = user_with_hash(Some(hash("hunter2hunter2")));
        assert!(!password_matches(&user, "hunter3hunter3"));
    }

    #[test]
    fn passwordless_account_never_matches() {
        let user = user_with_hash(None);
        assert!(!password_matches(&user, "anything"));
    }

    #[test]
    fn garbage_hash_never_matches() {
        let user = user_with_hash(Some("not-a-phc-string".to_string()));
        assert!(!password_matches(&user, "anything"));
    }
}
