use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{self, batch_queries, scrape_queries};
use crate::models::scrape::{FailedScrape, FailedScrapeStatus};
use crate::services::automation::{AutomationClient, AutomationError};
use crate::services::urlnorm;

/// Why a retry request was not carried through.
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    #[error("No failed scrape record for this website and batch")]
    NotFound,

    #[error("Record is not retryable from status {0}")]
    WrongState(FailedScrapeStatus),

    #[error("Automation dispatch failed, retry rolled back: {0}")]
    Upstream(#[source] AutomationError),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Retry one failed website.
///
/// The stored status gates admission: only a `failed` row moves to
/// `retrying` (attempts bumped in the same statement). The automation
/// dispatch follows; when it fails the transition is compensated back to
/// `failed`. The bumped attempt counter survives the rollback — the
/// dispatch was attempted.
pub async fn retry_single(
    pool: &PgPool,
    automation: &AutomationClient,
    website: &str,
    batch_id: Uuid,
) -> Result<FailedScrape, RetryError> {
    let record = match scrape_queries::begin_retry(pool, website, batch_id).await? {
        Some(record) => record,
        None => {
            // Nothing admitted: either the key is unknown or the row is in
            // a state the machine does not allow a retry from.
            return match scrape_queries::get_failed(pool, website, batch_id).await? {
                Some(existing) => Err(RetryError::WrongState(existing.status)),
                None => Err(RetryError::NotFound),
            };
        }
    };

    let owner = batch_queries::get_batch(pool, batch_id)
        .await?
        .and_then(|b| b.owner_user_id);
    let urls = vec![urlnorm::normalize_url(website)];

    if let Err(e) = automation
        .dispatch(batch_id, owner.as_deref(), &urls, None, None)
        .await
    {
        scrape_queries::rollback_retry(pool, website, batch_id).await?;
        metrics::counter!("retries_rolled_back_total").increment(1);
        tracing::warn!(website, %batch_id, error = %e, "Retry dispatch failed, status rolled back");
        return Err(RetryError::Upstream(e));
    }

    metrics::counter!("retries_dispatched_total").increment(1);
    db::notify_change(pool, "failed_scrapes", batch_id, Some(website), "retrying").await;

    tracing::info!(
        website,
        %batch_id,
        attempts = record.attempts,
        "Retry dispatched to automation platform"
    );

    Ok(record)
}

/// Retry failed websites of a batch in bulk.
///
/// All currently failed rows (or the selected subset) move to `retrying`
/// in one statement, then a single automation call carries the whole URL
/// list. A failed call rolls every affected row back to `failed` in one
/// statement. The rows stay individually addressable throughout: per-URL
/// outcomes arrive later through the scrape-failed / scrape-success
/// callbacks and reconcile each row on its own.
pub async fn retry_batch(
    pool: &PgPool,
    automation: &AutomationClient,
    batch_id: Uuid,
    websites: Option<Vec<String>>,
    subject: Option<&str>,
    message: Option<&str>,
) -> Result<Vec<FailedScrape>, RetryError> {
    let batch = batch_queries::get_batch(pool, batch_id)
        .await?
        .ok_or(RetryError::NotFound)?;

    let admitted =
        scrape_queries::begin_retry_batch(pool, batch_id, websites.as_deref()).await?;

    if admitted.is_empty() {
        return Ok(admitted);
    }

    let affected: Vec<String> = admitted.iter().map(|r| r.website.clone()).collect();
    let urls: Vec<String> = admitted
        .iter()
        .map(|r| urlnorm::normalize_url(&r.website))
        .collect();

    if let Err(e) = automation
        .dispatch(
            batch_id,
            batch.owner_user_id.as_deref(),
            &urls,
            subject,
            message,
        )
        .await
    {
        let reverted = scrape_queries::rollback_retry_batch(pool, batch_id, &affected).await?;
        metrics::counter!("retries_rolled_back_total").increment(reverted);
        tracing::warn!(
            %batch_id,
            affected = affected.len(),
            error = %e,
            "Bulk retry dispatch failed, all records rolled back"
        );
        return Err(RetryError::Upstream(e));
    }

    metrics::counter!("retries_dispatched_total").increment(admitted.len() as u64);
    db::notify_change(pool, "failed_scrapes", batch_id, None, "retrying").await;

    tracing::info!(
        %batch_id,
        retried = admitted.len(),
        "Bulk retry dispatched to automation platform"
    );

    Ok(admitted)
}
