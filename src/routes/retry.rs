use axum::extract::{Path, State};
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::{self, scrape_queries};
use crate::models::events::{Ack, BulkRetryRequest, BulkRetryResponse, RetryScrapeRequest, WontFixRequest};
use crate::routes::error::ApiError;
use crate::services::retry;

/// POST /api/v1/retry-scrape — retry one failed website.
///
/// Runs inside the deployment boundary with service credentials; 404 when
/// the key has no failed row, 409 when the authoritative status is already
/// `retrying`, 502 when the automation dispatch fails (the status is
/// compensated back to `failed` first).
pub async fn retry_scrape(
    State(state): State<AppState>,
    Json(req): Json<RetryScrapeRequest>,
) -> Result<Json<Ack>, ApiError> {
    req.validate()?;

    retry::retry_single(&state.db, &state.automation, &req.website, req.batch_id).await?;

    Ok(Json(Ack::ok()))
}

/// POST /api/v1/batches/:id/retry — retry failed websites of a batch.
///
/// Omitting `websites` retries everything currently failed. The response
/// reports how many rows were admitted; per-URL outcomes arrive later via
/// the scrape callbacks.
pub async fn retry_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Json(req): Json<BulkRetryRequest>,
) -> Result<Json<BulkRetryResponse>, ApiError> {
    req.validate()?;

    let admitted = retry::retry_batch(
        &state.db,
        &state.automation,
        batch_id,
        req.websites,
        req.subject.as_deref(),
        req.message.as_deref(),
    )
    .await?;

    Ok(Json(BulkRetryResponse {
        ok: true,
        retried: admitted.len(),
    }))
}

/// POST /api/v1/scrapes/wont-fix — park a failed website as not worth
/// retrying. Terminal; the row disappears from default failure listings.
pub async fn wont_fix(
    State(state): State<AppState>,
    Json(req): Json<WontFixRequest>,
) -> Result<Json<Ack>, ApiError> {
    req.validate()?;

    let affected = scrape_queries::mark_wont_fix(&state.db, &req.website, req.batch_id).await?;
    if affected == 0 {
        return Err(ApiError::NotFound(
            "No failed scrape record for this website and batch".to_string(),
        ));
    }

    db::notify_change(
        &state.db,
        "failed_scrapes",
        req.batch_id,
        Some(&req.website),
        "wont-fix",
    )
    .await;

    tracing::info!(website = %req.website, batch_id = %req.batch_id, "Record parked as wont-fix");

    Ok(Json(Ack::ok()))
}
