use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Initialize PostgreSQL connection pool
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

/// Postgres NOTIFY channel the console subscribes to for row changes.
pub const EVENTS_CHANNEL: &str = "outreach_events";

/// Emit a change notification for realtime subscribers.
///
/// Best-effort: the row mutation has already committed, so a failed notify
/// is logged and swallowed rather than failing the request.
pub async fn notify_change(
    pool: &PgPool,
    table: &str,
    batch_id: uuid::Uuid,
    website: Option<&str>,
    status: &str,
) {
    let payload = serde_json::json!({
        "table": table,
        "batch_id": batch_id,
        "website": website,
        "status": status,
    });

    let result = sqlx::query("SELECT pg_notify($1, $2)")
        .bind(EVENTS_CHANNEL)
        .bind(payload.to_string())
        .execute(pool)
        .await;

    if let Err(e) = result {
        tracing::warn!(table, %batch_id, error = %e, "Failed to emit change notification");
    }
}

pub mod batch_queries;
pub mod scrape_queries;
