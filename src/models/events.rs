use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminator the automation platform must send on failure callbacks.
pub const SCRAPE_FAILED_EVENT: &str = "scrape_failed";

/// Failure callback from the automation platform.
#[derive(Debug, Deserialize, Validate)]
pub struct ScrapeFailedEvent {
    /// Must equal [`SCRAPE_FAILED_EVENT`].
    #[garde(length(min = 1))]
    pub event: String,

    #[garde(length(min = 1, max = 2048))]
    pub website: String,

    #[garde(skip)]
    pub batch_id: Uuid,

    #[garde(length(min = 1, max = 100))]
    pub error_code: String,

    #[garde(length(min = 1, max = 4096))]
    pub error_message: String,

    #[garde(skip)]
    pub timestamp: DateTime<Utc>,

    /// Attempt counter as reported upstream; used only for the first insert.
    #[garde(skip)]
    pub attempt: Option<i32>,
}

/// Success callback carrying the enriched lead fields.
#[derive(Debug, Deserialize, Validate)]
pub struct ScrapeSuccessEvent {
    #[garde(length(min = 1, max = 2048))]
    pub website: String,

    #[garde(skip)]
    pub batch_id: Uuid,

    #[garde(length(max = 2048))]
    pub domain: Option<String>,

    #[garde(length(max = 512))]
    pub company: Option<String>,

    #[garde(skip)]
    pub emails: Option<Vec<String>>,

    #[garde(length(max = 256))]
    pub industry: Option<String>,

    #[garde(skip)]
    pub icebreaker: Option<String>,

    #[garde(skip)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Resolution callback: the platform confirmed a previously failed website.
#[derive(Debug, Deserialize, Validate)]
pub struct ScrapeResolvedEvent {
    #[garde(length(min = 1, max = 2048))]
    pub website: String,

    #[garde(skip)]
    pub batch_id: Uuid,
}

/// Authoritative completion signal for a whole batch.
#[derive(Debug, Deserialize, Validate)]
pub struct BatchCompleteEvent {
    #[garde(skip)]
    pub batch_id: Uuid,
}

/// Operator request to retry a single failed website.
#[derive(Debug, Deserialize, Validate)]
pub struct RetryScrapeRequest {
    #[garde(length(min = 1, max = 2048))]
    pub website: String,

    #[garde(skip)]
    pub batch_id: Uuid,
}

/// Operator request to retry failed websites of a batch in bulk.
/// When `websites` is absent every currently failed row is retried.
#[derive(Debug, Deserialize, Validate)]
pub struct BulkRetryRequest {
    #[garde(skip)]
    pub websites: Option<Vec<String>>,

    #[garde(length(max = 512))]
    pub subject: Option<String>,

    #[garde(skip)]
    pub message: Option<String>,
}

/// Operator request to park a failed website as not worth retrying.
#[derive(Debug, Deserialize, Validate)]
pub struct WontFixRequest {
    #[garde(length(min = 1, max = 2048))]
    pub website: String,

    #[garde(skip)]
    pub batch_id: Uuid,
}

/// Operator request to open a new batch.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBatchRequest {
    #[garde(length(min = 1, max = 10_000))]
    pub urls: Vec<String>,

    #[garde(length(max = 256))]
    pub label: Option<String>,
}

/// Minimal acknowledgement body shared by the callback endpoints.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// Acknowledgement for scrape-success, reporting the determined status.
#[derive(Debug, Serialize)]
pub struct SuccessAck {
    pub ok: bool,
    pub status: String,
    pub message: String,
}

/// Response to create-batch. The caller forwards `urls` (already
/// normalized) to the automation platform itself.
#[derive(Debug, Serialize)]
pub struct CreateBatchResponse {
    pub ok: bool,
    pub batch_uuid: Uuid,
    pub owner_user_id: String,
    pub total_urls: i32,
    pub urls: Vec<String>,
}

/// Response to a bulk retry: how many rows were marked retrying.
#[derive(Debug, Serialize)]
pub struct BulkRetryResponse {
    pub ok: bool,
    pub retried: usize,
}

/// Response to mark-all-stale-complete.
#[derive(Debug, Serialize)]
pub struct CompleteStaleResponse {
    pub ok: bool,
    pub completed: usize,
}
