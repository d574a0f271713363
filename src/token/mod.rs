//! HS256 token codec for access and refresh credentials.
//!
//! Tokens are standard three-segment JWTs (`header.claims.signature`,
//! base64url without padding) signed with HMAC-SHA256. Access and refresh
//! tokens share the same claim shape but are signed with independent
//! secrets, so a refresh token can never pass access verification.
//!
//! The codec is pure: verification takes `now_unix_seconds` from the caller
//! so expiry behavior is deterministic under test.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Claims carried by both access and refresh tokens.
///
/// `email` is only present on access tokens issued by the refresh path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid key length")]
    KeyLength,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

impl Error {
    /// Expired tokens get a distinct user-facing message; every other
    /// failure collapses to "invalid".
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

/// Current wall-clock time as unix seconds.
///
/// Handlers pass this into the codec and storage layers instead of reading
/// the clock there, keeping expiry logic testable with fabricated times.
#[must_use]
#[allow(clippy::missing_panics_doc)] // system clock before 1970 is unrecoverable
pub fn unix_now() -> i64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch");
    i64::try_from(elapsed.as_secs()).expect("unix time overflows i64")
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, Error> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| Error::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Create an HS256 signed token for the given claims.
///
/// # Errors
///
/// Returns an error if the claims cannot be encoded or the key is rejected
/// by the MAC implementation.
pub fn sign_hs256(secret: &[u8], claims: &Claims) -> Result<String, Error> {
    let header_b64 = b64e_json(&TokenHeader::hs256())?;
    let claims_b64 = b64e_json(claims)?;
    let signing_input = format!("{header_b64}.{claims_b64}");

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| Error::KeyLength)?;
    mac.update(signing_input.as_bytes());
    let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature_b64}"))
}

/// Verify an HS256 token and return its decoded claims.
///
/// The signature is checked before any claim is interpreted, so a forged
/// token can never surface as `Expired`.
///
/// # Errors
///
/// Returns an error if:
/// - the token is malformed or contains invalid base64/json,
/// - the algorithm is not `HS256`,
/// - the signature does not match `secret`,
/// - `exp` is at or before `now_unix_seconds`.
pub fn verify_hs256(token: &str, secret: &[u8], now_unix_seconds: i64) -> Result<Claims, Error> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(Error::TokenFormat)?;
    let claims_b64 = parts.next().ok_or(Error::TokenFormat)?;
    let sig_b64 = parts.next().ok_or(Error::TokenFormat)?;
    if parts.next().is_some() {
        return Err(Error::TokenFormat);
    }

    let header: TokenHeader = b64d_json(header_b64)?;
    if header.alg != "HS256" {
        return Err(Error::UnsupportedAlg(header.alg));
    }

    let signing_input = format!("{header_b64}.{claims_b64}");
    let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| Error::Base64)?;
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| Error::KeyLength)?;
    mac.update(signing_input.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| Error::InvalidSignature)?;

    let claims: Claims = b64d_json(claims_b64)?;
    if claims.exp <= now_unix_seconds {
        return Err(Error::Expired);
    }

    Ok(claims)
}

/// Signing keys and TTLs for the two token families.
///
/// Built once at startup from CLI configuration and shared behind an `Arc`.
#[derive(Clone)]
pub struct TokenKeys {
    access_secret: SecretString,
    refresh_secret: SecretString,
    access_ttl_minutes: i64,
    refresh_ttl_days: i64,
}

impl TokenKeys {
    #[must_use]
    pub fn new(
        access_secret: SecretString,
        refresh_secret: SecretString,
        access_ttl_minutes: i64,
        refresh_ttl_days: i64,
    ) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_ttl_minutes,
            refresh_ttl_days,
        }
    }

    #[must_use]
    pub const fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_days * 24 * 60 * 60
    }

    /// Issue a short-lived access token.
    ///
    /// # Errors
    /// Returns an error if claim encoding or signing fails.
    pub fn issue_access(
        &self,
        sub: Uuid,
        role: &str,
        email: Option<String>,
        now_unix_seconds: i64,
    ) -> Result<String, Error> {
        let claims = Claims {
            sub,
            role: role.to_string(),
            email,
            iat: now_unix_seconds,
            exp: now_unix_seconds + self.access_ttl_minutes * 60,
        };
        sign_hs256(self.access_secret.expose_secret().as_bytes(), &claims)
    }

    /// Issue a refresh token, returning the token and its expiry so the
    /// caller can persist the session row with the same `exp`.
    ///
    /// # Errors
    /// Returns an error if claim encoding or signing fails.
    pub fn issue_refresh(
        &self,
        sub: Uuid,
        role: &str,
        now_unix_seconds: i64,
    ) -> Result<(String, i64), Error> {
        let exp = now_unix_seconds + self.refresh_ttl_seconds();
        let claims = Claims {
            sub,
            role: role.to_string(),
            email: None,
            iat: now_unix_seconds,
            exp,
        };
        let token = sign_hs256(self.refresh_secret.expose_secret().as_bytes(), &claims)?;
        Ok((token, exp))
    }

    /// # Errors
    /// See [`verify_hs256`].
    pub fn verify_access(&self, token: &str, now_unix_seconds: i64) -> Result<Claims, Error> {
        verify_hs256(
            token,
            self.access_secret.expose_secret().as_bytes(),
            now_unix_seconds,
        )
    }

    /// # Errors
    /// See [`verify_hs256`].
    pub fn verify_refresh(&self, token: &str, now_unix_seconds: i64) -> Result<Claims, Error> {
        verify_hs256(
            token,
            self.refresh_secret.expose_secret().as_bytes(),
            now_unix_seconds,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";
    const NOW: i64 = 1_700_000_000;

    fn test_claims() -> Claims {
        Claims {
            sub: Uuid::nil(),
            role: "user".to_string(),
            email: None,
            iat: NOW,
            exp: NOW + 900,
        }
    }

    fn keys() -> TokenKeys {
        TokenKeys::new(
            SecretString::from("access-secret".to_string()),
            SecretString::from("refresh-secret".to_string()),
            15,
            7,
        )
    }

    #[test]
    fn round_trip_preserves_claims() -> Result<(), Error> {
        let claims = test_claims();
        let token = sign_hs256(SECRET, &claims)?;
        let verified = verify_hs256(&token, SECRET, NOW)?;
        assert_eq!(verified, claims);
        Ok(())
    }

    #[test]
    fn round_trip_with_email_claim() -> Result<(), Error> {
        let claims = Claims {
            email: Some("alice@example.com".to_string()),
            ..test_claims()
        };
        let token = sign_hs256(SECRET, &claims)?;
        let verified = verify_hs256(&token, SECRET, NOW)?;
        assert_eq!(verified.email.as_deref(), Some("alice@example.com"));
        Ok(())
    }

    #[test]
    fn expired_token_is_expired_not_invalid() -> Result<(), Error> {
        let claims = Claims {
            exp: NOW - 1,
            ..test_claims()
        };
        let token = sign_hs256(SECRET, &claims)?;
        let result = verify_hs256(&token, SECRET, NOW);
        assert!(matches!(result, Err(Error::Expired)));
        Ok(())
    }

    #[test]
    fn expiry_boundary_is_exclusive() -> Result<(), Error> {
        let claims = test_claims();
        let token = sign_hs256(SECRET, &claims)?;
        assert!(verify_hs256(&token, SECRET, claims.exp - 1).is_ok());
        assert!(matches!(
            verify_hs256(&token, SECRET, claims.exp),
            Err(Error::Expired)
        ));
        Ok(())
    }

    #[test]
    fn wrong_secret_is_invalid_signature_even_when_expired() -> Result<(), Error> {
        let claims = Claims {
            exp: NOW - 1,
            ..test_claims()
        };
        let token = sign_hs256(SECRET, &claims)?;
        let result = verify_hs256(&token, b"other-secret", NOW);
        // Signature is checked first, so forged tokens never read as expired.
        assert!(matches!(result, Err(Error::InvalidSignature)));
        Ok(())
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(matches!(
            verify_hs256("not-a-jwt", SECRET, NOW),
            Err(Error::TokenFormat)
        ));
        assert!(matches!(
            verify_hs256("a.b.c.d", SECRET, NOW),
            Err(Error::TokenFormat)
        ));
        assert!(matches!(
            verify_hs256("!!!.!!!.!!!", SECRET, NOW),
            Err(Error::Base64)
        ));
    }

    #[test]
    fn tampered_claims_fail_verification() -> Result<(), Error> {
        let token = sign_hs256(SECRET, &test_claims())?;
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = Claims {
            role: "admin".to_string(),
            ..test_claims()
        };
        let forged_b64 = b64e_json(&forged)?;
        parts[1] = &forged_b64;
        let tampered = parts.join(".");
        assert!(matches!(
            verify_hs256(&tampered, SECRET, NOW),
            Err(Error::InvalidSignature)
        ));
        Ok(())
    }

    #[test]
    fn rejects_unsupported_algorithm() -> Result<(), Error> {
        let header = TokenHeader {
            alg: "none".to_string(),
            typ: "JWT".to_string(),
        };
        let token = format!("{}.{}.{}", b64e_json(&header)?, b64e_json(&test_claims())?, "");
        let result = verify_hs256(&token, SECRET, NOW);
        assert!(matches!(result, Err(Error::UnsupportedAlg(alg)) if alg == "none"));
        Ok(())
    }

    #[test]
    fn access_and_refresh_secrets_are_independent() -> Result<(), Error> {
        let keys = keys();
        let access = keys.issue_access(Uuid::nil(), "user", None, NOW)?;
        let (refresh, exp) = keys.issue_refresh(Uuid::nil(), "user", NOW)?;

        assert!(keys.verify_access(&access, NOW).is_ok());
        assert!(keys.verify_refresh(&refresh, NOW).is_ok());
        assert_eq!(exp, NOW + 7 * 24 * 60 * 60);

        // Cross-verification must fail closed.
        assert!(matches!(
            keys.verify_access(&refresh, NOW),
            Err(Error::InvalidSignature)
        ));
        assert!(matches!(
            keys.verify_refresh(&access, NOW),
            Err(Error::InvalidSignature)
        ));
        Ok(())
    }

    #[test]
    fn issued_access_token_carries_ttl_and_role() -> Result<(), Error> {
        let keys = keys();
        let sub = Uuid::new_v4();
        let token = keys.issue_access(sub, "admin", Some("admin@example.com".to_string()), NOW)?;
        let claims = keys.verify_access(&token, NOW)?;
        assert_eq!(claims.sub, sub);
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.email.as_deref(), Some("admin@example.com"));
        assert_eq!(claims.iat, NOW);
        assert_eq!(claims.exp, NOW + 15 * 60);
        Ok(())
    }

    #[test]
    fn error_expired_classification() {
        assert!(Error::Expired.is_expired());
        assert!(!Error::InvalidSignature.is_expired());
        assert!(!Error::TokenFormat.is_expired());
    }
}
