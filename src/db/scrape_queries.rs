use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::scrape::{FailedScrape, FailedScrapeStatus, SuccessStatus, SuccessfulScrape};

fn failed_from_row(row: &sqlx::postgres::PgRow) -> Result<FailedScrape, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    let status = FailedScrapeStatus::from_str(&status_str).unwrap_or(FailedScrapeStatus::Failed);

    Ok(FailedScrape {
        id: row.try_get("id")?,
        website: row.try_get("website")?,
        batch_id: row.try_get("batch_id")?,
        error_code: row.try_get("error_code")?,
        error_message: row.try_get("error_message")?,
        attempts: row.try_get("attempts")?,
        status,
        failed_at: row.try_get("failed_at")?,
        last_updated: row.try_get("last_updated")?,
    })
}

fn success_from_row(row: &sqlx::postgres::PgRow) -> Result<SuccessfulScrape, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    let status = SuccessStatus::from_str(&status_str).unwrap_or(SuccessStatus::Success);

    Ok(SuccessfulScrape {
        id: row.try_get("id")?,
        website: row.try_get("website")?,
        batch_id: row.try_get("batch_id")?,
        domain: row.try_get("domain")?,
        company: row.try_get("company")?,
        emails: row.try_get("emails")?,
        industry: row.try_get("industry")?,
        icebreaker: row.try_get("icebreaker")?,
        status,
        created_at: row.try_get("created_at")?,
    })
}

const FAILED_COLUMNS: &str =
    "id, website, batch_id, error_code, error_message, attempts, status, failed_at, last_updated";

/// Record a failure callback for (website, batch).
///
/// A single atomic upsert: the first callback inserts the row with
/// `attempts = reported attempt or 1`; every later callback for the same
/// key increments the stored counter and overwrites the error fields,
/// forcing the status back to `failed`. Concurrent callbacks cannot
/// undercount because the increment happens inside the statement.
pub async fn upsert_failed(
    pool: &PgPool,
    website: &str,
    batch_id: Uuid,
    error_code: &str,
    error_message: &str,
    failed_at: DateTime<Utc>,
    first_attempt: i32,
) -> Result<FailedScrape, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO failed_scrapes
            (website, batch_id, error_code, error_message, attempts, status, failed_at)
        VALUES ($1, $2, $3, $4, $5, 'failed', $6)
        ON CONFLICT (website, batch_id) DO UPDATE SET
            error_code = EXCLUDED.error_code,
            error_message = EXCLUDED.error_message,
            attempts = failed_scrapes.attempts + 1,
            status = 'failed',
            failed_at = EXCLUDED.failed_at,
            last_updated = NOW()
        RETURNING {FAILED_COLUMNS}
        "#
    ))
    .bind(website)
    .bind(batch_id)
    .bind(error_code)
    .bind(error_message)
    .bind(first_attempt)
    .bind(failed_at)
    .fetch_one(pool)
    .await?;

    failed_from_row(&row)
}

/// Get a failed row by its (website, batch) key.
pub async fn get_failed(
    pool: &PgPool,
    website: &str,
    batch_id: Uuid,
) -> Result<Option<FailedScrape>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {FAILED_COLUMNS}
        FROM failed_scrapes
        WHERE website = $1 AND batch_id = $2
        "#
    ))
    .bind(website)
    .bind(batch_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(failed_from_row).transpose()
}

/// Failed rows of a batch. `wont-fix` rows are parked and excluded unless
/// explicitly requested.
pub async fn list_failed_for_batch(
    pool: &PgPool,
    batch_id: Uuid,
    include_wont_fix: bool,
) -> Result<Vec<FailedScrape>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {FAILED_COLUMNS}
        FROM failed_scrapes
        WHERE batch_id = $1 AND ($2 OR status <> 'wont-fix')
        ORDER BY failed_at DESC
        "#
    ))
    .bind(batch_id)
    .bind(include_wont_fix)
    .fetch_all(pool)
    .await?;

    rows.iter().map(failed_from_row).collect()
}

/// Mark a failed row `resolved`. Deliberately unconditional on current
/// status; affecting zero rows is not an error (idempotent callback).
pub async fn resolve_failed(
    pool: &PgPool,
    website: &str,
    batch_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE failed_scrapes
        SET status = 'resolved', last_updated = NOW()
        WHERE website = $1 AND batch_id = $2
        "#,
    )
    .bind(website)
    .bind(batch_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Park a failed row as `wont-fix`. Returns rows affected so the caller can
/// 404 on an unknown key.
pub async fn mark_wont_fix(
    pool: &PgPool,
    website: &str,
    batch_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE failed_scrapes
        SET status = 'wont-fix', last_updated = NOW()
        WHERE website = $1 AND batch_id = $2
        "#,
    )
    .bind(website)
    .bind(batch_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Admit a single retry: move the row to `retrying` and bump `attempts`,
/// gated on the authoritative stored status being `failed`. Returns the
/// updated row, or None when no `failed` row matched (the caller then
/// distinguishes a missing key from a row in the wrong state).
pub async fn begin_retry(
    pool: &PgPool,
    website: &str,
    batch_id: Uuid,
) -> Result<Option<FailedScrape>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE failed_scrapes
        SET status = 'retrying', attempts = attempts + 1, last_updated = NOW()
        WHERE website = $1 AND batch_id = $2 AND status = 'failed'
        RETURNING {FAILED_COLUMNS}
        "#
    ))
    .bind(website)
    .bind(batch_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(failed_from_row).transpose()
}

/// Compensate a retry whose automation dispatch failed: put the row back to
/// `failed`, keeping the bumped attempt counter.
pub async fn rollback_retry(
    pool: &PgPool,
    website: &str,
    batch_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE failed_scrapes
        SET status = 'failed', last_updated = NOW()
        WHERE website = $1 AND batch_id = $2 AND status = 'retrying'
        "#,
    )
    .bind(website)
    .bind(batch_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Admit a bulk retry: every `failed` row of the batch (optionally limited
/// to a website subset) moves to `retrying` in one statement. Each returned
/// row remains individually addressable; per-URL outcomes are reconciled by
/// later callbacks, not by this call.
pub async fn begin_retry_batch(
    pool: &PgPool,
    batch_id: Uuid,
    websites: Option<&[String]>,
) -> Result<Vec<FailedScrape>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        UPDATE failed_scrapes
        SET status = 'retrying', attempts = attempts + 1, last_updated = NOW()
        WHERE batch_id = $1 AND status = 'failed'
          AND ($2::text[] IS NULL OR website = ANY($2))
        RETURNING {FAILED_COLUMNS}
        "#
    ))
    .bind(batch_id)
    .bind(websites)
    .fetch_all(pool)
    .await?;

    rows.iter().map(failed_from_row).collect()
}

/// Compensate a failed bulk dispatch: all affected rows revert to `failed`
/// in one statement.
pub async fn rollback_retry_batch(
    pool: &PgPool,
    batch_id: Uuid,
    websites: &[String],
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE failed_scrapes
        SET status = 'failed', last_updated = NOW()
        WHERE batch_id = $1 AND website = ANY($2) AND status = 'retrying'
        "#,
    )
    .bind(batch_id)
    .bind(websites)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Insert a success row. The UNIQUE (website, batch_id) constraint makes a
/// duplicate delivery surface as a database error the caller maps to 409.
pub async fn insert_success(
    pool: &PgPool,
    website: &str,
    batch_id: Uuid,
    domain: Option<&str>,
    company: Option<&str>,
    emails: &[String],
    industry: Option<&str>,
    icebreaker: Option<&str>,
    status: SuccessStatus,
) -> Result<SuccessfulScrape, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO successful_scrapes
            (website, batch_id, domain, company, emails, industry, icebreaker, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, website, batch_id, domain, company, emails, industry,
                  icebreaker, status, created_at
        "#,
    )
    .bind(website)
    .bind(batch_id)
    .bind(domain)
    .bind(company)
    .bind(emails)
    .bind(industry)
    .bind(icebreaker)
    .bind(status.to_string())
    .fetch_one(pool)
    .await?;

    success_from_row(&row)
}

/// True when the error is a Postgres unique-constraint violation, i.e. a
/// duplicate success delivery for an existing (website, batch) key.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}
