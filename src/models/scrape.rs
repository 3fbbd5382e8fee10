use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Lifecycle of a failed scrape row.
///
/// `failed → retrying → {resolved | failed}`; `wont-fix` is terminal and
/// hidden from default listings. Rows are never hard-deleted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FailedScrapeStatus {
    Failed,
    Retrying,
    Resolved,
    WontFix,
}

/// Status of a successful scrape row: `resolved` when a failed row existed
/// for the same (website, batch) key at insert time, `success` otherwise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SuccessStatus {
    Success,
    Resolved,
}

/// One failure outcome per (website, batch) pair. Repeated failure
/// callbacks for the same key increment `attempts` in place rather than
/// creating new rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedScrape {
    pub id: Uuid,
    pub website: String,
    pub batch_id: Uuid,
    pub error_code: String,
    pub error_message: String,
    pub attempts: i32,
    pub status: FailedScrapeStatus,
    pub failed_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// An enriched lead row delivered by the automation platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessfulScrape {
    pub id: Uuid,
    pub website: String,
    pub batch_id: Uuid,
    pub domain: Option<String>,
    pub company: Option<String>,
    pub emails: Vec<String>,
    pub industry: Option<String>,
    pub icebreaker: Option<String>,
    pub status: SuccessStatus,
    pub created_at: DateTime<Utc>,
}
