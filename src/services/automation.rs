use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

use crate::services::auth::WEBHOOK_SECRET_HEADER;

/// Client for the external automation platform's inbound webhook.
///
/// One POST per dispatch; a non-2xx response or transport error is a total
/// failure of that call. Retries are always operator-initiated upstream of
/// this client — it never retries on its own.
pub struct AutomationClient {
    http: Client,
    webhook_url: String,
    secret: String,
}

/// Body of an outbound dispatch. The platform scrapes asynchronously and
/// reports per-URL outcomes back through the relay's callback endpoints.
#[derive(Debug, Serialize)]
struct DispatchRequest<'a> {
    batch_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
    urls: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl AutomationClient {
    pub fn new(webhook_url: &str, secret: &str) -> Self {
        Self {
            http: Client::new(),
            webhook_url: webhook_url.to_string(),
            secret: secret.to_string(),
        }
    }

    /// Dispatch a URL list to the automation platform.
    pub async fn dispatch(
        &self,
        batch_id: Uuid,
        user_id: Option<&str>,
        urls: &[String],
        subject: Option<&str>,
        message: Option<&str>,
    ) -> Result<(), AutomationError> {
        let body = DispatchRequest {
            batch_id,
            user_id,
            urls,
            subject,
            message,
        };

        let start = std::time::Instant::now();
        let response = self
            .http
            .post(&self.webhook_url)
            .header(WEBHOOK_SECRET_HEADER, &self.secret)
            .json(&body)
            .send()
            .await
            .map_err(AutomationError::Http)?;
        metrics::histogram!("automation_dispatch_seconds").record(start.elapsed().as_secs_f64());

        let status = response.status();
        if !status.is_success() {
            return Err(AutomationError::UpstreamStatus(status.as_u16()));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AutomationError {
    #[error("Automation webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Automation webhook returned status {0}")]
    UpstreamStatus(u16),
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_dispatch_sends_secret_and_urls() {
        let server = MockServer::start().await;
        let batch_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header(WEBHOOK_SECRET_HEADER, "s3cret"))
            .and(body_partial_json(serde_json::json!({
                "batch_id": batch_id,
                "urls": ["https://a.com", "https://b.com"],
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = AutomationClient::new(&format!("{}/hook", server.uri()), "s3cret");
        let urls = vec!["https://a.com".to_string(), "https://b.com".to_string()];

        client
            .dispatch(batch_id, Some("user-1"), &urls, None, None)
            .await
            .expect("dispatch should succeed");
    }

    #[tokio::test]
    async fn test_non_2xx_is_upstream_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = AutomationClient::new(&server.uri(), "s3cret");
        let urls = vec!["https://a.com".to_string()];

        let err = client
            .dispatch(Uuid::new_v4(), None, &urls, None, None)
            .await
            .expect_err("500 must be an error");

        assert!(matches!(err, AutomationError::UpstreamStatus(500)));
    }
}
