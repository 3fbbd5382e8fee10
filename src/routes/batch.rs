use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use garde::Validate;
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::{self, batch_queries, scrape_queries};
use crate::models::batch::{Batch, BatchProgress};
use crate::models::events::{Ack, CompleteStaleResponse, CreateBatchRequest, CreateBatchResponse};
use crate::models::scrape::FailedScrape;
use crate::routes::error::ApiError;
use crate::services::{reconcile, urlnorm};

/// POST /api/v1/batches — open a new batch of websites.
///
/// The response hands the normalized URL list back to the caller, which
/// forwards it to the automation platform itself; the relay does not
/// dispatch here.
pub async fn create_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateBatchRequest>,
) -> Result<Json<CreateBatchResponse>, ApiError> {
    let user_id = state.auth.resolve_bearer_user(&headers)?;
    req.validate()?;

    let urls = urlnorm::normalize_urls(&req.urls);
    if urls.is_empty() {
        return Err(ApiError::BadRequest("urls must not be empty".to_string()));
    }

    let batch = batch_queries::create_batch(
        &state.db,
        req.label.as_deref(),
        &user_id,
        urls.len() as i32,
    )
    .await?;

    metrics::counter!("batches_created_total").increment(1);
    db::notify_change(&state.db, "batches", batch.id, None, "pending").await;

    tracing::info!(
        batch_id = %batch.id,
        owner = %user_id,
        total_urls = batch.total_urls,
        "Batch created"
    );

    Ok(Json(CreateBatchResponse {
        ok: true,
        batch_uuid: batch.id,
        owner_user_id: user_id,
        total_urls: batch.total_urls,
        urls,
    }))
}

/// GET /api/v1/batches — batches, newest first.
pub async fn list_batches(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Batch>>, ApiError> {
    state.auth.resolve_bearer_user(&headers)?;

    let batches = batch_queries::list_batches(&state.db, 200).await?;
    Ok(Json(batches))
}

#[derive(Debug, Deserialize)]
pub struct ListFailedParams {
    #[serde(default)]
    pub include_wont_fix: bool,
}

/// GET /api/v1/batches/:id/failed — failed rows of a batch for triage.
/// `wont-fix` rows stay hidden unless `?include_wont_fix=true`.
pub async fn list_failed(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(batch_id): Path<Uuid>,
    Query(params): Query<ListFailedParams>,
) -> Result<Json<Vec<FailedScrape>>, ApiError> {
    state.auth.resolve_bearer_user(&headers)?;

    let rows =
        scrape_queries::list_failed_for_batch(&state.db, batch_id, params.include_wont_fix).await?;
    Ok(Json(rows))
}

/// GET /api/v1/batches/stale — processing batches whose counters indicate
/// completion but whose status was never updated.
pub async fn list_stale(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<BatchProgress>>, ApiError> {
    state.auth.resolve_bearer_user(&headers)?;

    let stale = reconcile::find_stale(&state.db, state.config.stale_after_minutes).await?;
    Ok(Json(stale))
}

/// POST /api/v1/batches/:id/complete — operator's "mark complete".
pub async fn mark_complete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(batch_id): Path<Uuid>,
) -> Result<Json<Ack>, ApiError> {
    state.auth.resolve_bearer_user(&headers)?;

    let affected = batch_queries::mark_complete(&state.db, batch_id).await?;
    if affected == 0 {
        return Err(ApiError::NotFound("Unknown batch".to_string()));
    }

    db::notify_change(&state.db, "batches", batch_id, None, "complete").await;

    tracing::info!(%batch_id, "Batch marked complete by operator");

    Ok(Json(Ack::ok()))
}

/// POST /api/v1/batches/complete-stale — operator's "mark all complete".
pub async fn complete_stale(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CompleteStaleResponse>, ApiError> {
    state.auth.resolve_bearer_user(&headers)?;

    let completed =
        reconcile::complete_all_stale(&state.db, state.config.stale_after_minutes).await?;

    Ok(Json(CompleteStaleResponse {
        ok: true,
        completed,
    }))
}
