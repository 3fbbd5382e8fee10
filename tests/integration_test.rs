//! Store-level integration tests.
//!
//! These require a running PostgreSQL instance configured via
//! DATABASE_URL (plus the other required env vars for AppConfig).
//!
//! Run with: cargo test --test integration_test -- --ignored

use chrono::Utc;
use outreach_relay::{
    config::AppConfig,
    db::{self, batch_queries, scrape_queries},
    models::batch::BatchStatus,
    models::scrape::{FailedScrapeStatus, SuccessStatus},
    services::reconcile,
};
use sqlx::PgPool;
use uuid::Uuid;

async fn test_pool() -> PgPool {
    let config = AppConfig::from_env().expect("Failed to load config");
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&pool).await.expect("Failed to run migrations");
    pool
}

fn unique_site(tag: &str) -> String {
    format!("https://{}-{}.example.com", tag, Uuid::new_v4())
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_failure_upsert_increments_attempts() {
    let pool = test_pool().await;

    let batch = batch_queries::create_batch(&pool, Some("itest"), "itest-user", 2)
        .await
        .expect("Failed to create batch");
    assert_eq!(batch.status, BatchStatus::Pending);

    let website = unique_site("fail");

    // First failure callback inserts the row
    let first = scrape_queries::upsert_failed(
        &pool,
        &website,
        batch.id,
        "TIMEOUT",
        "timed out",
        Utc::now(),
        1,
    )
    .await
    .expect("Failed to upsert");

    assert_eq!(first.attempts, 1);
    assert_eq!(first.status, FailedScrapeStatus::Failed);

    // A repeat delivery increments attempts and overwrites error fields
    let second = scrape_queries::upsert_failed(
        &pool,
        &website,
        batch.id,
        "DNS",
        "host not found",
        Utc::now(),
        1,
    )
    .await
    .expect("Failed to upsert again");

    assert_eq!(second.attempts, 2);
    assert_eq!(second.error_code, "DNS");
    assert_eq!(second.status, FailedScrapeStatus::Failed);

    // Only one row exists for the key
    let row = scrape_queries::get_failed(&pool, &website, batch.id)
        .await
        .expect("Failed to get")
        .expect("Row missing");
    assert_eq!(row.id, first.id);

    // The counter bump moved the batch into processing
    batch_queries::increment_processed(&pool, batch.id)
        .await
        .expect("Failed to increment");
    let batch = batch_queries::get_batch(&pool, batch.id)
        .await
        .expect("Failed to get batch")
        .expect("Batch missing");
    assert_eq!(batch.status, BatchStatus::Processing);

    println!("✓ Failure upsert semantics verified");
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_success_resolves_prior_failure_and_rejects_duplicates() {
    let pool = test_pool().await;

    let batch = batch_queries::create_batch(&pool, Some("itest"), "itest-user", 1)
        .await
        .expect("Failed to create batch");
    let website = unique_site("resolve");

    scrape_queries::upsert_failed(&pool, &website, batch.id, "TIMEOUT", "timed out", Utc::now(), 1)
        .await
        .expect("Failed to upsert");

    // A success for the same key resolves the failed row
    let prior = scrape_queries::get_failed(&pool, &website, batch.id)
        .await
        .expect("Failed to get")
        .is_some();
    assert!(prior);

    scrape_queries::resolve_failed(&pool, &website, batch.id)
        .await
        .expect("Failed to resolve");

    let emails = vec!["ceo@example.com".to_string()];
    let lead = scrape_queries::insert_success(
        &pool,
        &website,
        batch.id,
        Some("example.com"),
        Some("Example Inc"),
        &emails,
        Some("SaaS"),
        Some("Saw your launch post"),
        SuccessStatus::Resolved,
    )
    .await
    .expect("Failed to insert success");

    assert_eq!(lead.status, SuccessStatus::Resolved);

    let failed = scrape_queries::get_failed(&pool, &website, batch.id)
        .await
        .expect("Failed to get")
        .expect("Row missing");
    assert_eq!(failed.status, FailedScrapeStatus::Resolved);

    // A duplicate delivery trips the uniqueness constraint
    let dup = scrape_queries::insert_success(
        &pool,
        &website,
        batch.id,
        None,
        None,
        &[],
        None,
        None,
        SuccessStatus::Success,
    )
    .await;

    let err = dup.expect_err("Duplicate insert must fail");
    assert!(scrape_queries::is_unique_violation(&err));

    // Resolving twice stays resolved without error
    scrape_queries::resolve_failed(&pool, &website, batch.id)
        .await
        .expect("Second resolve must not error");
    let failed = scrape_queries::get_failed(&pool, &website, batch.id)
        .await
        .expect("Failed to get")
        .expect("Row missing");
    assert_eq!(failed.status, FailedScrapeStatus::Resolved);

    println!("✓ Success reconciliation and duplicate rejection verified");
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_retry_gate_and_rollback() {
    let pool = test_pool().await;

    let batch = batch_queries::create_batch(&pool, Some("itest"), "itest-user", 1)
        .await
        .expect("Failed to create batch");
    let website = unique_site("retry");

    scrape_queries::upsert_failed(&pool, &website, batch.id, "TIMEOUT", "timed out", Utc::now(), 1)
        .await
        .expect("Failed to upsert");

    // Admission moves failed → retrying and bumps attempts
    let admitted = scrape_queries::begin_retry(&pool, &website, batch.id)
        .await
        .expect("Failed to begin retry")
        .expect("Retry not admitted");
    assert_eq!(admitted.status, FailedScrapeStatus::Retrying);
    assert_eq!(admitted.attempts, 2);

    // A second admission is refused while the row is retrying
    let refused = scrape_queries::begin_retry(&pool, &website, batch.id)
        .await
        .expect("Failed to begin retry");
    assert!(refused.is_none());

    // Compensation reverts to failed, keeping the bumped counter
    let reverted = scrape_queries::rollback_retry(&pool, &website, batch.id)
        .await
        .expect("Failed to rollback");
    assert_eq!(reverted, 1);

    let row = scrape_queries::get_failed(&pool, &website, batch.id)
        .await
        .expect("Failed to get")
        .expect("Row missing");
    assert_eq!(row.status, FailedScrapeStatus::Failed);
    assert_eq!(row.attempts, 2);

    println!("✓ Retry gate and compensation verified");
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_bulk_retry_marks_and_reverts_selection() {
    let pool = test_pool().await;

    let batch = batch_queries::create_batch(&pool, Some("itest"), "itest-user", 3)
        .await
        .expect("Failed to create batch");

    let sites: Vec<String> = (0..3).map(|i| unique_site(&format!("bulk{i}"))).collect();
    for site in &sites {
        scrape_queries::upsert_failed(&pool, site, batch.id, "TIMEOUT", "timed out", Utc::now(), 1)
            .await
            .expect("Failed to upsert");
    }

    // Park one row; it must not be admitted by the bulk path
    scrape_queries::mark_wont_fix(&pool, &sites[2], batch.id)
        .await
        .expect("Failed to park");

    let admitted = scrape_queries::begin_retry_batch(&pool, batch.id, None)
        .await
        .expect("Failed to begin bulk retry");
    assert_eq!(admitted.len(), 2);
    assert!(admitted.iter().all(|r| r.status == FailedScrapeStatus::Retrying));

    // Revert all affected rows in one statement
    let affected: Vec<String> = admitted.iter().map(|r| r.website.clone()).collect();
    let reverted = scrape_queries::rollback_retry_batch(&pool, batch.id, &affected)
        .await
        .expect("Failed to rollback");
    assert_eq!(reverted, 2);

    // The parked row stays hidden from the default triage listing
    let listed = scrape_queries::list_failed_for_batch(&pool, batch.id, false)
        .await
        .expect("Failed to list");
    assert_eq!(listed.len(), 2);

    let listed_all = scrape_queries::list_failed_for_batch(&pool, batch.id, true)
        .await
        .expect("Failed to list");
    assert_eq!(listed_all.len(), 3);

    println!("✓ Bulk retry selection and rollback verified");
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_stale_batch_detection_and_completion() {
    let pool = test_pool().await;

    let batch = batch_queries::create_batch(&pool, Some("itest-stale"), "itest-user", 1)
        .await
        .expect("Failed to create batch");
    let website = unique_site("stale");

    scrape_queries::upsert_failed(&pool, &website, batch.id, "TIMEOUT", "timed out", Utc::now(), 1)
        .await
        .expect("Failed to upsert");
    batch_queries::increment_processed(&pool, batch.id)
        .await
        .expect("Failed to increment");

    // Not stale yet: counters cover the batch but it was just touched
    let stale = reconcile::find_stale(&pool, 30).await.expect("Scan failed");
    assert!(!stale.iter().any(|p| p.batch.id == batch.id));

    // Age the batch past the threshold
    sqlx::query("UPDATE batches SET updated_at = NOW() - INTERVAL '45 minutes' WHERE id = $1")
        .bind(batch.id)
        .execute(&pool)
        .await
        .expect("Failed to age batch");

    let stale = reconcile::find_stale(&pool, 30).await.expect("Scan failed");
    assert!(stale.iter().any(|p| p.batch.id == batch.id));

    // Operator bulk action force-completes it
    let completed = reconcile::complete_all_stale(&pool, 30)
        .await
        .expect("Failed to complete stale");
    assert!(completed >= 1);

    let batch = batch_queries::get_batch(&pool, batch.id)
        .await
        .expect("Failed to get batch")
        .expect("Batch missing");
    assert_eq!(batch.status, BatchStatus::Complete);

    let stale = reconcile::find_stale(&pool, 30).await.expect("Scan failed");
    assert!(!stale.iter().any(|p| p.batch.id == batch.id));

    println!("✓ Staleness detection and force-completion verified");
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_change_feed_emits_notifications() {
    let pool = test_pool().await;

    let mut listener = sqlx::postgres::PgListener::connect_with(&pool)
        .await
        .expect("Failed to create listener");
    listener
        .listen(db::EVENTS_CHANNEL)
        .await
        .expect("Failed to listen");

    let batch_id = Uuid::new_v4();
    db::notify_change(&pool, "failed_scrapes", batch_id, Some("https://a.com"), "failed").await;

    let notification = tokio::time::timeout(std::time::Duration::from_secs(5), listener.recv())
        .await
        .expect("Timed out waiting for notification")
        .expect("Listener error");

    let payload: serde_json::Value =
        serde_json::from_str(notification.payload()).expect("Payload not JSON");
    assert_eq!(payload["table"], "failed_scrapes");
    assert_eq!(payload["batch_id"], batch_id.to_string());
    assert_eq!(payload["status"], "failed");

    println!("✓ Change feed notification verified");
}
