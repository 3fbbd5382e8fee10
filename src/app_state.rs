use sqlx::PgPool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{auth::AuthService, automation::AutomationClient};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub auth: Arc<AuthService>,
    pub automation: Arc<AutomationClient>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        auth: AuthService,
        automation: AutomationClient,
        config: AppConfig,
    ) -> Self {
        Self {
            db,
            auth: Arc::new(auth),
            automation: Arc::new(automation),
            config: Arc::new(config),
        }
    }
}
