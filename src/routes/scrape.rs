use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::db::{self, batch_queries, scrape_queries};
use crate::models::events::{
    Ack, BatchCompleteEvent, ScrapeFailedEvent, ScrapeResolvedEvent, ScrapeSuccessEvent,
    SuccessAck, SCRAPE_FAILED_EVENT,
};
use crate::models::scrape::SuccessStatus;
use crate::routes::error::ApiError;
use crate::services::urlnorm;

/// POST /hooks/scrape-failed — failure callback from the automation platform.
///
/// Upserts the (website, batch) failure row: first delivery inserts it,
/// repeats increment `attempts` and overwrite the error fields. Always
/// answers 202 — the row change itself reaches the console through the
/// change feed.
pub async fn scrape_failed(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<ScrapeFailedEvent>,
) -> Result<(StatusCode, Json<Ack>), ApiError> {
    state.auth.verify_webhook_secret(&headers)?;
    event.validate()?;

    if event.event != SCRAPE_FAILED_EVENT {
        return Err(ApiError::BadRequest(format!(
            "Unexpected event discriminator: {}",
            event.event
        )));
    }

    let record = scrape_queries::upsert_failed(
        &state.db,
        &event.website,
        event.batch_id,
        &event.error_code,
        &event.error_message,
        event.timestamp,
        event.attempt.unwrap_or(1),
    )
    .await?;

    batch_queries::increment_processed(&state.db, event.batch_id).await?;

    metrics::counter!("scrape_callbacks_total", "outcome" => "failed").increment(1);
    db::notify_change(
        &state.db,
        "failed_scrapes",
        event.batch_id,
        Some(&event.website),
        "failed",
    )
    .await;

    tracing::info!(
        website = %event.website,
        batch_id = %event.batch_id,
        error_code = %event.error_code,
        attempts = record.attempts,
        "Scrape failure recorded"
    );

    Ok((StatusCode::ACCEPTED, Json(Ack::ok())))
}

/// POST /hooks/scrape-success — success callback carrying enriched lead data.
///
/// A prior failure for the same key marks the lead `resolved`; otherwise
/// `success`. A duplicate delivery trips the uniqueness constraint and is
/// answered with 409 rather than overwriting the stored lead.
pub async fn scrape_success(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<ScrapeSuccessEvent>,
) -> Result<Json<SuccessAck>, ApiError> {
    state.auth.verify_webhook_secret(&headers)?;
    event.validate()?;

    let prior_failure = scrape_queries::get_failed(&state.db, &event.website, event.batch_id)
        .await?
        .is_some();

    let status = if prior_failure {
        scrape_queries::resolve_failed(&state.db, &event.website, event.batch_id).await?;
        SuccessStatus::Resolved
    } else {
        SuccessStatus::Success
    };

    let emails = urlnorm::dedup_exact(event.emails.unwrap_or_default());
    scrape_queries::insert_success(
        &state.db,
        &event.website,
        event.batch_id,
        event.domain.as_deref(),
        event.company.as_deref(),
        &emails,
        event.industry.as_deref(),
        event.icebreaker.as_deref(),
        status,
    )
    .await
    .map_err(|e| {
        if scrape_queries::is_unique_violation(&e) {
            metrics::counter!("scrape_callbacks_total", "outcome" => "duplicate").increment(1);
            ApiError::Conflict("Success record already exists for this website and batch".to_string())
        } else {
            ApiError::from(e)
        }
    })?;

    batch_queries::increment_processed(&state.db, event.batch_id).await?;

    metrics::counter!("scrape_callbacks_total", "outcome" => "success").increment(1);
    db::notify_change(
        &state.db,
        "successful_scrapes",
        event.batch_id,
        Some(&event.website),
        &status.to_string(),
    )
    .await;

    tracing::info!(
        website = %event.website,
        batch_id = %event.batch_id,
        status = %status,
        "Scrape success recorded"
    );

    Ok(Json(SuccessAck {
        ok: true,
        status: status.to_string(),
        message: "Scrape result recorded".to_string(),
    }))
}

/// POST /hooks/scrape-resolved — the platform confirmed a failed website.
///
/// Unconditional status update by key; idempotent, and a missing row is a
/// quiet no-op rather than an error.
pub async fn scrape_resolved(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<ScrapeResolvedEvent>,
) -> Result<Json<Ack>, ApiError> {
    state.auth.verify_webhook_secret(&headers)?;
    event.validate()?;

    let affected = scrape_queries::resolve_failed(&state.db, &event.website, event.batch_id).await?;

    if affected > 0 {
        db::notify_change(
            &state.db,
            "failed_scrapes",
            event.batch_id,
            Some(&event.website),
            "resolved",
        )
        .await;
    }

    tracing::info!(
        website = %event.website,
        batch_id = %event.batch_id,
        affected,
        "Scrape resolution callback applied"
    );

    Ok(Json(Ack::ok()))
}

/// POST /hooks/batch-complete — authoritative completion signal for a batch.
/// The staleness heuristic remains as a fallback for platforms that never
/// send this.
pub async fn batch_complete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<BatchCompleteEvent>,
) -> Result<Json<Ack>, ApiError> {
    state.auth.verify_webhook_secret(&headers)?;
    event.validate()?;

    let affected = batch_queries::mark_complete(&state.db, event.batch_id).await?;
    if affected == 0 {
        return Err(ApiError::NotFound("Unknown batch".to_string()));
    }

    db::notify_change(&state.db, "batches", event.batch_id, None, "complete").await;

    tracing::info!(batch_id = %event.batch_id, "Batch completed by platform signal");

    Ok(Json(Ack::ok()))
}
