use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for the reconciler.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Shared secret the automation platform must send on callbacks
    pub webhook_secret: String,

    /// Automation platform webhook URL for retry dispatch
    pub automation_webhook_url: String,

    /// Shared secret sent on outbound automation calls
    pub automation_webhook_secret: String,

    /// HS256 key for operator bearer tokens
    pub jwt_secret: String,

    /// Minutes without an update before a counted-out batch is stale
    #[serde(default = "default_stale_after_minutes")]
    pub stale_after_minutes: i64,

    /// Seconds between reconciler scans
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_stale_after_minutes() -> i64 {
    30
}

fn default_reconcile_interval_secs() -> u64 {
    60
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
