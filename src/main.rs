mod app_state;
mod config;
mod db;
mod models;
mod routes;
mod services;

use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use services::{auth::AuthService, automation::AutomationClient};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing outreach-relay server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!(
        "scrape_callbacks_total",
        "Scrape outcome callbacks received from the automation platform"
    );
    metrics::describe_counter!("batches_created_total", "Batches opened by operators");
    metrics::describe_counter!(
        "retries_dispatched_total",
        "Failed scrapes re-dispatched to the automation platform"
    );
    metrics::describe_counter!(
        "retries_rolled_back_total",
        "Retry transitions compensated after a failed dispatch"
    );
    metrics::describe_gauge!(
        "stale_batches",
        "Processing batches whose counters indicate completion"
    );
    metrics::describe_histogram!(
        "automation_dispatch_seconds",
        "Latency of outbound automation webhook calls"
    );

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run database migrations
    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Initialize services
    let auth = AuthService::new(&config.webhook_secret, &config.jwt_secret);
    let automation = AutomationClient::new(
        &config.automation_webhook_url,
        &config.automation_webhook_secret,
    );

    let bind_addr = config.bind_addr.clone();

    // Create shared application state
    let state = AppState::new(db_pool, auth, automation, config);

    // Build API routes
    let app = Router::new()
        // Automation platform callbacks
        .route("/hooks/scrape-failed", post(routes::scrape::scrape_failed))
        .route("/hooks/scrape-success", post(routes::scrape::scrape_success))
        .route("/hooks/scrape-resolved", post(routes::scrape::scrape_resolved))
        .route("/hooks/batch-complete", post(routes::scrape::batch_complete))
        // Retry / triage
        .route("/api/v1/retry-scrape", post(routes::retry::retry_scrape))
        .route("/api/v1/batches/{id}/retry", post(routes::retry::retry_batch))
        .route("/api/v1/scrapes/wont-fix", post(routes::retry::wont_fix))
        // Batch management
        .route(
            "/api/v1/batches",
            post(routes::batch::create_batch).get(routes::batch::list_batches),
        )
        .route("/api/v1/batches/stale", get(routes::batch::list_stale))
        .route(
            "/api/v1/batches/complete-stale",
            post(routes::batch::complete_stale),
        )
        .route("/api/v1/batches/{id}/failed", get(routes::batch::list_failed))
        .route(
            "/api/v1/batches/{id}/complete",
            post(routes::batch::mark_complete),
        )
        .route("/health", get(routes::health::health_check))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024)); // 2 MB limit

    tracing::info!("Starting outreach-relay on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
