use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Coarse lifecycle of a submitted batch of websites.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Processing,
    Complete,
}

/// A batch of websites submitted for scraping.
///
/// `processed_urls` is a running counter bumped by the relay endpoints as
/// outcomes arrive. It is expected to stay at or below `total_urls` but the
/// store does not enforce that; staleness detection works from the scrape
/// record counts instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub label: Option<String>,
    pub owner_user_id: Option<String>,
    pub status: BatchStatus,
    pub total_urls: i32,
    pub processed_urls: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A processing batch together with its scrape outcome counts, as scanned
/// by the staleness detector.
#[derive(Debug, Clone, Serialize)]
pub struct BatchProgress {
    pub batch: Batch,
    pub successful_count: i64,
    pub failed_count: i64,
}
