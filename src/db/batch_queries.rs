use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::batch::{Batch, BatchProgress, BatchStatus};

fn batch_from_row(row: &sqlx::postgres::PgRow) -> Result<Batch, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    let status = BatchStatus::from_str(&status_str).unwrap_or(BatchStatus::Pending);

    Ok(Batch {
        id: row.try_get("id")?,
        label: row.try_get("label")?,
        owner_user_id: row.try_get("owner_user_id")?,
        status,
        total_urls: row.try_get("total_urls")?,
        processed_urls: row.try_get("processed_urls")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Insert a new batch in `pending` status.
pub async fn create_batch(
    pool: &PgPool,
    label: Option<&str>,
    owner_user_id: &str,
    total_urls: i32,
) -> Result<Batch, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO batches (label, owner_user_id, status, total_urls)
        VALUES ($1, $2, 'pending', $3)
        RETURNING id, label, owner_user_id, status, total_urls, processed_urls,
                  created_at, updated_at
        "#,
    )
    .bind(label)
    .bind(owner_user_id)
    .bind(total_urls)
    .fetch_one(pool)
    .await?;

    batch_from_row(&row)
}

/// Get a batch by ID
pub async fn get_batch(pool: &PgPool, batch_id: Uuid) -> Result<Option<Batch>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, label, owner_user_id, status, total_urls, processed_urls,
               created_at, updated_at
        FROM batches
        WHERE id = $1
        "#,
    )
    .bind(batch_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(batch_from_row).transpose()
}

/// List batches, newest first.
pub async fn list_batches(pool: &PgPool, limit: i64) -> Result<Vec<Batch>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, label, owner_user_id, status, total_urls, processed_urls,
               created_at, updated_at
        FROM batches
        ORDER BY created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(batch_from_row).collect()
}

/// Bump the processed counter as a scrape outcome arrives. The first
/// outcome also moves a `pending` batch to `processing`.
pub async fn increment_processed(pool: &PgPool, batch_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE batches
        SET processed_urls = processed_urls + 1,
            status = CASE WHEN status = 'pending' THEN 'processing' ELSE status END,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(batch_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Force a batch to `complete`. Returns the number of rows affected so the
/// caller can report a missing batch.
pub async fn mark_complete(pool: &PgPool, batch_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE batches
        SET status = 'complete', updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(batch_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// All `processing` batches with their scrape outcome counts, for the
/// staleness scan.
pub async fn processing_with_counts(pool: &PgPool) -> Result<Vec<BatchProgress>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT b.id, b.label, b.owner_user_id, b.status, b.total_urls,
               b.processed_urls, b.created_at, b.updated_at,
               (SELECT COUNT(*) FROM successful_scrapes s WHERE s.batch_id = b.id) AS successful_count,
               (SELECT COUNT(*) FROM failed_scrapes f WHERE f.batch_id = b.id) AS failed_count
        FROM batches b
        WHERE b.status = 'processing'
        ORDER BY b.updated_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(BatchProgress {
                batch: batch_from_row(row)?,
                successful_count: row.try_get("successful_count")?,
                failed_count: row.try_get("failed_count")?,
            })
        })
        .collect()
}
