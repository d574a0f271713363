//! Authenticated principal resolution from bearer tokens.
//!
//! The guard is an explicit strategy selected at startup: the server wires
//! an `Arc<dyn Authenticator>` into the router and each handler builds a
//! fresh [`RequestAuth`] around it. The resolved principal is memoized for
//! the lifetime of that one request only; nothing is cached across requests
//! and failures are never retried.

use async_trait::async_trait;
use axum::http::{HeaderMap, header::AUTHORIZATION};
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::gate::Role;
use super::storage::lookup_user_by_id;
use crate::api::error::ApiError;
use crate::token::{Claims, TokenKeys, unix_now};

pub(crate) const MSG_TOKEN_MISSING: &str = "Token is not provided";
pub(crate) const MSG_TOKEN_EXPIRED: &str = "Token has expired";
pub(crate) const MSG_TOKEN_INVALID: &str = "Token is invalid";

/// Authenticated identity attached to a request. Derived from a verified
/// token plus a fresh user lookup; never persisted.
#[derive(Clone, Debug)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
    pub email: String,
}

/// Strategy interface for resolving the principal of an inbound request.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn resolve(&self, headers: &HeaderMap, pool: &PgPool) -> Result<Principal, ApiError>;
}

/// Bearer-JWT authenticator backed by the access-token secret.
pub struct JwtAuthenticator {
    keys: Arc<TokenKeys>,
}

impl JwtAuthenticator {
    #[must_use]
    pub fn new(keys: Arc<TokenKeys>) -> Self {
        Self { keys }
    }

    /// Header extraction and token verification, separated from the user
    /// lookup so the failure taxonomy is testable without a database.
    fn verified_claims(&self, headers: &HeaderMap, now_unix: i64) -> Result<Claims, ApiError> {
        let token = extract_bearer_token(headers)
            .ok_or_else(|| ApiError::Unauthenticated(MSG_TOKEN_MISSING.to_string()))?;

        self.keys.verify_access(&token, now_unix).map_err(|err| {
            if err.is_expired() {
                ApiError::Unauthenticated(MSG_TOKEN_EXPIRED.to_string())
            } else {
                ApiError::Unauthenticated(MSG_TOKEN_INVALID.to_string())
            }
        })
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn resolve(&self, headers: &HeaderMap, pool: &PgPool) -> Result<Principal, ApiError> {
        let claims = self.verified_claims(headers, unix_now())?;

        // An unknown subject reads the same as a bad token so deleted
        // accounts cannot be probed with stale credentials.
        let user = lookup_user_by_id(pool, claims.sub)
            .await?
            .ok_or_else(|| ApiError::Unauthenticated(MSG_TOKEN_INVALID.to_string()))?;

        let role = Role::from_str(&user.role)
            .map_err(|err| ApiError::Internal(anyhow::Error::new(err).context("Corrupt role column")))?;

        Ok(Principal {
            id: user.id,
            role,
            email: user.email,
        })
    }
}

/// Per-request authentication context.
///
/// Constructed fresh by each handler; memoizes the resolved principal so
/// multiple checks within one request hit the user store once.
pub struct RequestAuth {
    authenticator: Arc<dyn Authenticator>,
    resolved: OnceCell<Principal>,
}

impl RequestAuth {
    #[must_use]
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            resolved: OnceCell::new(),
        }
    }

    /// Resolve (or return the memoized) principal for this request.
    ///
    /// # Errors
    /// Returns `ApiError::Unauthenticated` with a reason the client can act
    /// on: missing, expired, or invalid token.
    pub async fn principal(
        &self,
        headers: &HeaderMap,
        pool: &PgPool,
    ) -> Result<&Principal, ApiError> {
        self.resolved
            .get_or_try_init(|| self.authenticator.resolve(headers, pool))
            .await
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use secrecy::SecretString;

    const NOW: i64 = 1_700_000_000;

    fn keys() -> Arc<TokenKeys> {
        Arc::new(TokenKeys::new(
            SecretString::from("access-secret".to_string()),
            SecretString::from("refresh-secret".to_string()),
            15,
            7,
        ))
    }

    fn bearer_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).expect("header value"),
        );
        headers
    }

    #[test]
    fn extract_bearer_token_variants() {
        assert_eq!(
            extract_bearer_token(&bearer_headers("abc")).as_deref(),
            Some("abc")
        );

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer xyz"));
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("xyz"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);

        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn missing_token_has_missing_message() {
        let guard = JwtAuthenticator::new(keys());
        let result = guard.verified_claims(&HeaderMap::new(), NOW);
        assert!(matches!(
            result,
            Err(ApiError::Unauthenticated(message)) if message == MSG_TOKEN_MISSING
        ));
    }

    #[test]
    fn valid_token_yields_claims() {
        let keys = keys();
        let guard = JwtAuthenticator::new(keys.clone());
        let sub = Uuid::new_v4();
        let token = keys
            .issue_access(sub, "user", None, NOW)
            .expect("token issued");
        let claims = guard
            .verified_claims(&bearer_headers(&token), NOW)
            .expect("claims verified");
        assert_eq!(claims.sub, sub);
        assert_eq!(claims.role, "user");
    }

    #[test]
    fn expired_token_has_expired_message() {
        let keys = keys();
        let guard = JwtAuthenticator::new(keys.clone());
        let token = keys
            .issue_access(Uuid::nil(), "user", None, NOW - 3600)
            .expect("token issued");
        let result = guard.verified_claims(&bearer_headers(&token), NOW);
        assert!(matches!(
            result,
            Err(ApiError::Unauthenticated(message)) if message == MSG_TOKEN_EXPIRED
        ));
    }

    #[test]
    fn refresh_token_fails_access_verification_as_invalid() {
        let keys = keys();
        let guard = JwtAuthenticator::new(keys.clone());
        let (token, _) = keys.issue_refresh(Uuid::nil(), "user", NOW).expect("token issued");
        let result = guard.verified_claims(&bearer_headers(&token), NOW);
        assert!(matches!(
            result,
            Err(ApiError::Unauthenticated(message)) if message == MSG_TOKEN_INVALID
        ));
    }

    #[test]
    fn garbage_token_has_invalid_message() {
        let guard = JwtAuthenticator::new(keys());
        let result = guard.verified_claims(&bearer_headers("definitely.not.a-jwt"), NOW);
        assert!(matches!(
            result,
            Err(ApiError::Unauthenticated(message)) if message == MSG_TOKEN_INVALID
        ));
    }
}
