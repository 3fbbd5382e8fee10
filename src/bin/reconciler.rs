use outreach_relay::{config::AppConfig, db, services::reconcile};
use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting stale-batch reconciler");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize database
    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    let interval = Duration::from_secs(config.reconcile_interval_secs);
    tracing::info!(
        interval_secs = config.reconcile_interval_secs,
        threshold_minutes = config.stale_after_minutes,
        "Reconciler ready, starting scan loop"
    );

    // Completion stays a manual operator action (or the batch-complete
    // callback); the loop only surfaces candidates.
    loop {
        match reconcile::find_stale(&db_pool, config.stale_after_minutes).await {
            Ok(stale) => {
                metrics::gauge!("stale_batches").set(stale.len() as f64);

                for progress in &stale {
                    tracing::warn!(
                        batch_id = %progress.batch.id,
                        label = progress.batch.label.as_deref().unwrap_or("-"),
                        total_urls = progress.batch.total_urls,
                        successful = progress.successful_count,
                        failed = progress.failed_count,
                        updated_at = %progress.batch.updated_at,
                        "Stale batch: counters indicate completion but status is still processing"
                    );
                }

                if stale.is_empty() {
                    tracing::debug!("No stale batches");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Staleness scan failed, will retry next interval");
            }
        }

        sleep(interval).await;
    }
}
