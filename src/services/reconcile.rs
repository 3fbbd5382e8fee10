use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db::{self, batch_queries};
use crate::models::batch::{BatchProgress, BatchStatus};

/// Classify a processing batch as stale.
///
/// The automation platform never emits an authoritative per-batch "done"
/// signal on its own, so completion is inferred: a batch whose outcome
/// counts cover every submitted URL but whose status never left
/// `processing`, and which has not been touched for `threshold_minutes`,
/// is considered finished and surfaced for manual completion. The
/// batch-complete callback is the authoritative path; this heuristic is the
/// fallback safety net.
pub fn is_stale(progress: &BatchProgress, threshold_minutes: i64, now: DateTime<Utc>) -> bool {
    if progress.batch.status != BatchStatus::Processing {
        return false;
    }

    let idle_minutes = now
        .signed_duration_since(progress.batch.updated_at)
        .num_minutes();

    idle_minutes >= threshold_minutes
        && progress.successful_count + progress.failed_count >= i64::from(progress.batch.total_urls)
}

/// Scan all processing batches and return the stale ones.
pub async fn find_stale(
    pool: &PgPool,
    threshold_minutes: i64,
) -> Result<Vec<BatchProgress>, sqlx::Error> {
    let now = Utc::now();
    let scanned = batch_queries::processing_with_counts(pool).await?;

    Ok(scanned
        .into_iter()
        .filter(|p| is_stale(p, threshold_minutes, now))
        .collect())
}

/// Force-complete every currently stale batch (the operator's
/// "mark all complete" action). Returns how many batches were completed.
pub async fn complete_all_stale(
    pool: &PgPool,
    threshold_minutes: i64,
) -> Result<usize, sqlx::Error> {
    let stale = find_stale(pool, threshold_minutes).await?;
    let mut completed = 0;

    for progress in &stale {
        let batch_id = progress.batch.id;
        if batch_queries::mark_complete(pool, batch_id).await? > 0 {
            completed += 1;
            db::notify_change(pool, "batches", batch_id, None, "complete").await;
            tracing::info!(%batch_id, "Stale batch force-completed");
        }
    }

    Ok(completed)
}
