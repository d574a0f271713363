//! Refresh and sign-out endpoints plus refresh-cookie helpers.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{InvalidHeaderValue, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::guard::{Authenticator, RequestAuth};
use super::state::AuthState;
use super::storage::{delete_refresh_token, lookup_valid_refresh};
use super::types::{RefreshData, RefreshResponse};
use crate::api::error::{ApiError, ErrorBody};
use crate::token::unix_now;

pub(crate) const REFRESH_COOKIE_NAME: &str = "refreshToken";

pub(crate) const MSG_REFRESH_MISSING: &str = "Refresh token is not provided";
pub(crate) const MSG_REFRESH_EXPIRED: &str = "Refresh token has expired";
pub(crate) const MSG_REFRESH_INVALID: &str = "Refresh token is invalid";

#[utoipa::path(
    post,
    path = "/v1/auth/refresh-token",
    responses(
        (status = 200, description = "New access token issued", body = RefreshResponse),
        (status = 401, description = "Refresh token missing, expired, or invalid", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Response, ApiError> {
    let now = unix_now();
    let raw_token = verified_refresh_cookie(&headers, &auth_state, now)?;

    // The raw cookie value is the lookup key. Deleted or expired rows both
    // read as an invalid token; the client cannot tell them apart.
    let user = lookup_valid_refresh(&pool, &raw_token, now)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated(MSG_REFRESH_INVALID.to_string()))?;

    // Refreshed access tokens carry the email claim; sign-in tokens do not.
    let token = auth_state
        .keys()
        .issue_access(user.id, &user.role, Some(user.email), now)
        .context("failed to issue access token")?;

    let body = RefreshResponse {
        code: 200,
        message: "Token refreshed successfully".to_string(),
        data: RefreshData { token },
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}

#[utoipa::path(
    post,
    path = "/v1/auth/signout",
    responses(
        (status = 204, description = "Signed out, session row deleted, cookie cleared"),
        (status = 401, description = "Missing bearer token or bad refresh token", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn signout(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    authenticator: Extension<Arc<dyn Authenticator>>,
) -> Result<Response, ApiError> {
    let auth = RequestAuth::new(authenticator.0.clone());
    auth.principal(&headers, &pool).await?;

    let raw_token = verified_refresh_cookie(&headers, &auth_state, unix_now())?;

    // Zero rows means the token was never issued or is already signed out.
    let deleted = delete_refresh_token(&pool, &raw_token).await?;
    if deleted == 0 {
        return Err(ApiError::Unauthenticated(MSG_REFRESH_INVALID.to_string()));
    }

    info!("Signed out successfully");
    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        SET_COOKIE,
        clear_refresh_cookie(&auth_state).context("failed to build refresh cookie")?,
    );
    Ok((StatusCode::NO_CONTENT, response_headers).into_response())
}

/// Extract the refresh cookie and verify its signature and expiry,
/// returning the raw token string for storage lookups.
fn verified_refresh_cookie(
    headers: &HeaderMap,
    auth_state: &AuthState,
    now_unix: i64,
) -> Result<String, ApiError> {
    let raw_token = extract_refresh_cookie(headers)
        .ok_or_else(|| ApiError::Unauthenticated(MSG_REFRESH_MISSING.to_string()))?;

    auth_state
        .keys()
        .verify_refresh(&raw_token, now_unix)
        .map_err(|err| {
            if err.is_expired() {
                ApiError::Unauthenticated(MSG_REFRESH_EXPIRED.to_string())
            } else {
                ApiError::Unauthenticated(MSG_REFRESH_INVALID.to_string())
            }
        })?;

    Ok(raw_token)
}

pub(super) fn extract_refresh_cookie(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == REFRESH_COOKIE_NAME && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

/// Build the `HttpOnly` refresh cookie carrying `token`.
pub(super) fn refresh_cookie(
    auth_state: &AuthState,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = auth_state.keys().refresh_ttl_seconds();
    let secure = auth_state.refresh_cookie_secure();
    let mut cookie = format!(
        "{REFRESH_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn clear_refresh_cookie(
    auth_state: &AuthState,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = auth_state.refresh_cookie_secure();
    let mut cookie = format!("{REFRESH_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKeys;
    use axum::http::header::COOKIE;
    use secrecy::SecretString;
    use uuid::Uuid;

    const NOW: i64 = 1_700_000_000;

    fn state(frontend: &str) -> AuthState {
        let keys = TokenKeys::new(
            SecretString::from("access-secret".to_string()),
            SecretString::from("refresh-secret".to_string()),
            15,
            7,
        );
        AuthState::new(frontend.to_string(), Arc::new(keys))
    }

    fn cookie_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(value).expect("cookie header"),
        );
        headers
    }

    #[test]
    fn extracts_refresh_cookie_among_others() {
        let headers = cookie_headers("theme=dark; refreshToken=abc.def.ghi; lang=en");
        assert_eq!(
            extract_refresh_cookie(&headers).as_deref(),
            Some("abc.def.ghi")
        );
    }

    #[test]
    fn empty_or_missing_cookie_yields_none() {
        assert_eq!(extract_refresh_cookie(&HeaderMap::new()), None);
        assert_eq!(
            extract_refresh_cookie(&cookie_headers("refreshToken=")),
            None
        );
        assert_eq!(extract_refresh_cookie(&cookie_headers("theme=dark")), None);
    }

    #[test]
    fn missing_cookie_has_missing_message() {
        let result = verified_refresh_cookie(&HeaderMap::new(), &state("http://localhost"), NOW);
        assert!(matches!(
            result,
            Err(ApiError::Unauthenticated(message)) if message == MSG_REFRESH_MISSING
        ));
    }

    #[test]
    fn expired_refresh_has_expired_message() {
        let auth_state = state("http://localhost");
        let (token, _) = auth_state
            .keys()
            .issue_refresh(Uuid::nil(), "user", NOW - 30 * 24 * 60 * 60)
            .expect("token issued");
        let headers = cookie_headers(&format!("refreshToken={token}"));
        let result = verified_refresh_cookie(&headers, &auth_state, NOW);
        assert!(matches!(
            result,
            Err(ApiError::Unauthenticated(message)) if message == MSG_REFRESH_EXPIRED
        ));
    }

    #[test]
    fn access_token_in_cookie_reads_as_invalid() {
        let auth_state = state("http://localhost");
        let token = auth_state
            .keys()
            .issue_access(Uuid::nil(), "user", None, NOW)
            .expect("token issued");
        let headers = cookie_headers(&format!("refreshToken={token}"));
        let result = verified_refresh_cookie(&headers, &auth_state, NOW);
        assert!(matches!(
            result,
            Err(ApiError::Unauthenticated(message)) if message == MSG_REFRESH_INVALID
        ));
    }

    #[test]
    fn valid_refresh_returns_raw_token() {
        let auth_state = state("http://localhost");
        let (token, _) = auth_state
            .keys()
            .issue_refresh(Uuid::nil(), "user", NOW)
            .expect("token issued");
        let headers = cookie_headers(&format!("refreshToken={token}"));
        let raw = verified_refresh_cookie(&headers, &auth_state, NOW).expect("verified");
        assert_eq!(raw, token);
    }

    #[test]
    fn cookie_attributes_follow_frontend_scheme() {
        let secure_state = state("https://aduan.dev");
        let cookie = refresh_cookie(&secure_state, "tok").expect("cookie built");
        let cookie = cookie.to_str().expect("ascii");
        assert!(cookie.starts_with("refreshToken=tok; Path=/; HttpOnly; SameSite=Lax"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(cookie.ends_with("; Secure"));

        let plain_state = state("http://localhost:5173");
        let cookie = clear_refresh_cookie(&plain_state).expect("cookie built");
        let cookie = cookie.to_str().expect("ascii");
        assert!(cookie.contains("Max-Age=0"));
        assert!(!cookie.contains("Secure"));
    }
}
