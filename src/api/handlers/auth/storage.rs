//! Database helpers for users and refresh-token sessions.
//!
//! Refresh-token rows are the only shared mutable auth state. They are
//! keyed by the raw opaque token string, invalidated by deletion, and
//! filtered by expiry at query time; stale rows are harmless and simply
//! never match.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

/// Minimal user fields the auth paths need.
pub(crate) struct UserRecord {
    pub(crate) id: Uuid,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) avatar: String,
    pub(crate) role: String,
    pub(crate) password_hash: Option<String>,
}

pub(crate) async fn lookup_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>> {
    let query = r"
        SELECT id, username, email, avatar, role, password_hash
        FROM users
        WHERE id = $1
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    Ok(row.map(user_from_row))
}

pub(crate) async fn lookup_user_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<UserRecord>> {
    let query = r"
        SELECT id, username, email, avatar, role, password_hash
        FROM users
        WHERE email = $1
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    Ok(row.map(user_from_row))
}

fn user_from_row(row: sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        avatar: row.get("avatar"),
        role: row.get("role"),
        password_hash: row.get("password_hash"),
    }
}

/// Persist a refresh-token session row, one per issued token. Two
/// sign-ins within the same second mint the same token (claims are
/// identical), so the insert upserts on the token column.
pub(crate) async fn insert_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    token: &str,
    expires_at_unix: i64,
) -> Result<()> {
    let query = r"
        INSERT INTO refresh_tokens (user_id, token, expires_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (token) DO UPDATE SET expires_at = EXCLUDED.expires_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(token)
        .bind(expires_at_unix)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert refresh token")?;
    Ok(())
}

/// Look up a stored session by its raw token, returning the owning user.
/// Expiry is enforced here: rows with `expires_at <= now` never match even
/// though they still exist.
pub(crate) async fn lookup_valid_refresh(
    pool: &PgPool,
    token: &str,
    now_unix: i64,
) -> Result<Option<UserRecord>> {
    let query = r"
        SELECT users.id, users.username, users.email, users.avatar,
               users.role, users.password_hash
        FROM refresh_tokens
        JOIN users ON users.id = refresh_tokens.user_id
        WHERE refresh_tokens.token = $1
          AND refresh_tokens.expires_at > $2
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token)
        .bind(now_unix)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup refresh token")?;

    Ok(row.map(user_from_row))
}

/// Delete the session row for `token`, returning how many rows matched.
/// Zero means the token was never issued or was already signed out.
pub(crate) async fn delete_refresh_token(pool: &PgPool, token: &str) -> Result<u64> {
    let query = "DELETE FROM refresh_tokens WHERE token = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(token)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete refresh token")?;
    Ok(result.rows_affected())
}

/// Self-service profile update. Only username and avatar are writable.
pub(crate) async fn update_user_profile(
    pool: &PgPool,
    id: Uuid,
    username: Option<&str>,
    avatar: Option<&str>,
) -> Result<Option<UserRecord>> {
    let query = r"
        UPDATE users
        SET username = COALESCE($2, username),
            avatar = COALESCE($3, avatar),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, username, email, avatar, role, password_hash
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .bind(username)
        .bind(avatar)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update user profile")?;

    Ok(row.map(user_from_row))
}

#[cfg(test)]
mod tests {
    use super::UserRecord;
    use uuid::Uuid;

    #[test]
    fn user_record_holds_values() {
        let record = UserRecord {
            id: Uuid::nil(),
            username: "citizen".to_string(),
            email: "citizen@example.com".to_string(),
            avatar: "https://cdn.example.com/default.png".to_string(),
            role: "user".to_string(),
            password_hash: None,
        };
        assert_eq!(record.id, Uuid::nil());
        assert_eq!(record.role, "user");
        assert!(record.password_hash.is_none());
    }
}
