//! Database helpers for complaints.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

pub(crate) struct ComplaintRecord {
    pub(crate) id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) category_id: Option<Uuid>,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) status: String,
    pub(crate) images: Vec<String>,
}

fn complaint_from_row(row: sqlx::postgres::PgRow) -> ComplaintRecord {
    ComplaintRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        category_id: row.get("category_id"),
        title: row.get("title"),
        description: row.get("description"),
        status: row.get("status"),
        images: row.get("images"),
    }
}

pub(crate) async fn lookup_complaint(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<ComplaintRecord>> {
    let query = r"
        SELECT id, user_id, category_id, title, description, status, images
        FROM complaints
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
        .context("failed to lookup complaint")?;

    Ok(row.map(complaint_from_row))
}

pub(crate) async fn insert_complaint(
    pool: &PgPool,
    user_id: Uuid,
    title: &str,
    description: &str,
    category_id: Option<Uuid>,
    status: &str,
    images: &[String],
) -> Result<ComplaintRecord> {
    let query = r"
        INSERT INTO complaints (user_id, title, description, category_id, status, images)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, user_id, category_id, title, description, status, images
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(category_id)
        .bind(status)
        .bind(images)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert complaint")?;

    Ok(complaint_from_row(row))
}

/// Persist field changes and the reconciled image set in one statement.
/// `images` as `None` leaves the stored set untouched.
pub(crate) async fn update_complaint(
    pool: &PgPool,
    id: Uuid,
    title: Option<&str>,
    description: Option<&str>,
    category_id: Option<Uuid>,
    status: Option<&str>,
    images: Option<&[String]>,
) -> Result<Option<ComplaintRecord>> {
    let query = r"
        UPDATE complaints
        SET title = COALESCE($2, title),
            description = COALESCE($3, description),
            category_id = COALESCE($4, category_id),
            status = COALESCE($5, status),
            images = COALESCE($6, images),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, user_id, category_id, title, description, status, images
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(category_id)
        .bind(status)
        .bind(images)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update complaint")?;

    Ok(row.map(complaint_from_row))
}

pub(crate) async fn update_images(pool: &PgPool, id: Uuid, images: &[String]) -> Result<()> {
    let query = r"
        UPDATE complaints
        SET images = $2, updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .bind(images)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update complaint images")?;
    Ok(())
}

pub(crate) async fn delete_complaint(pool: &PgPool, id: Uuid) -> Result<u64> {
    let query = "DELETE FROM complaints WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete complaint")?;
    Ok(result.rows_affected())
}
