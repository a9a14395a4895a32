//! WebSub hub publish notifications

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use std::time::Duration;

use super::http::{self, check_status};
use super::traits::PingTransport;
use crate::error::DeliveryError;
use crate::types::{PingAck, PingMethod, PingTarget};

/// Notifies a WebSub hub that a feed has new content
///
/// Sends `hub.mode=publish` and `hub.url=<feed>` as a form body. Any 2xx
/// status is an acceptance; hubs normally answer 202 or 204.
#[derive(Clone)]
pub struct WebSubClient {
    client: reqwest::Client,
    hub_url: String,
}

impl WebSubClient {
    /// Create a client for the hub at `hub_url`
    pub fn new(client: reqwest::Client, hub_url: impl Into<String>) -> Self {
        Self {
            client,
            hub_url: hub_url.into(),
        }
    }

    /// Hub endpoint this client publishes to
    pub fn hub_url(&self) -> &str {
        &self.hub_url
    }

    /// Publish `feed_url` to the hub
    pub async fn notify(&self, feed_url: &str, timeout: Duration) -> Result<PingAck, DeliveryError> {
        let params = [("hub.mode", "publish"), ("hub.url", feed_url)];

        let response = self
            .client
            .post(&self.hub_url)
            .header(USER_AGENT, http::USER_AGENT)
            .timeout(timeout)
            .form(&params)
            .send()
            .await
            .map_err(|e| DeliveryError::from_transport(&e, timeout))?;

        let response = check_status(response).await?;
        let status = response.status();

        tracing::debug!(
            hub = %self.hub_url,
            feed_url,
            status = status.as_u16(),
            "hub accepted publish notification"
        );

        Ok(PingAck {
            message: format!(
                "Hub accepted notification (HTTP {} {})",
                status.as_u16(),
                status.canonical_reason().unwrap_or("OK")
            ),
            status: Some(status.as_u16()),
        })
    }
}

#[async_trait]
impl PingTransport for WebSubClient {
    async fn ping(&self, target: &PingTarget, timeout: Duration) -> Result<PingAck, DeliveryError> {
        self.notify(&target.feed_url, timeout).await
    }

    fn method(&self) -> PingMethod {
        PingMethod::WebSub
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::IsRetryable;
    use wiremock::matchers::{body_string_contains, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = "https://ping.example.com/feed?urls=https%3A%2F%2Fexample.com%2F";

    async fn hub_responding(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn sends_publish_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("hub.mode=publish"))
            .and(body_string_contains(
                "hub.url=https%3A%2F%2Fping.example.com%2Ffeed%3Furls%3Dhttps%253A%252F%252Fexample.com%252F",
            ))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let client = WebSubClient::new(reqwest::Client::new(), server.uri());
        let ack = client.notify(FEED, Duration::from_secs(5)).await.unwrap();

        assert_eq!(ack.status, Some(202));
        assert_eq!(ack.message, "Hub accepted notification (HTTP 202 Accepted)");
    }

    #[tokio::test]
    async fn no_content_is_success() {
        let server = hub_responding(ResponseTemplate::new(204)).await;
        let client = WebSubClient::new(reqwest::Client::new(), server.uri());

        let ack = client.notify(FEED, Duration::from_secs(5)).await.unwrap();
        assert_eq!(ack.status, Some(204));
    }

    #[tokio::test]
    async fn ping_announces_the_target_feed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("hub.url=https%3A%2F%2Ffeed.example.com%2Fatom"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let client = WebSubClient::new(reqwest::Client::new(), server.uri());
        let target = PingTarget::new("https://example.com/", "https://feed.example.com/atom");
        client.ping(&target, Duration::from_secs(5)).await.unwrap();
    }

    #[tokio::test]
    async fn server_error_is_retryable() {
        let server = hub_responding(ResponseTemplate::new(500).set_body_string("hub exploded")).await;
        let client = WebSubClient::new(reqwest::Client::new(), server.uri());

        let err = client.notify(FEED, Duration::from_secs(5)).await.unwrap_err();
        assert_eq!(
            err,
            DeliveryError::Server {
                status: 500,
                message: "hub exploded".to_string()
            }
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn client_error_is_terminal() {
        let server = hub_responding(ResponseTemplate::new(404)).await;
        let client = WebSubClient::new(reqwest::Client::new(), server.uri());

        let err = client.notify(FEED, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Rejected { status: 404, .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn rate_limit_carries_retry_hint() {
        let server = hub_responding(ResponseTemplate::new(429).insert_header("Retry-After", "30")).await;
        let client = WebSubClient::new(reqwest::Client::new(), server.uri());

        let err = client.notify(FEED, Duration::from_secs(5)).await.unwrap_err();
        assert_eq!(err.retry_after(), Some(30));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn slow_hub_times_out() {
        let server = hub_responding(
            ResponseTemplate::new(202).set_delay(Duration::from_millis(500)),
        )
        .await;
        let client = WebSubClient::new(reqwest::Client::new(), server.uri());

        let err = client
            .notify(FEED, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Timeout { .. }));
        assert!(err.is_retryable());
    }
}
