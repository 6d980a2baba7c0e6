//! HTTP client for the Push to Kindle service.

use crate::{classify_response, Deliver, DeliveryRequest, DeliveryResult, Outcome};
use async_trait::async_trait;
use reqwest::header::{ORIGIN, REFERER};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Default endpoint of the Push to Kindle service.
pub const DEFAULT_SERVICE_URL: &str = "https://pushtokindle.fivefilters.org/send.php";

/// Environment variable overriding the service endpoint.
pub const SERVICE_URL_ENV_VAR: &str = "U2K_SERVICE_URL";

/// Response header carrying the service's failure code.
pub const FAILURE_HEADER: &str = "X-PushToKindle-Failed";

/// Literal response body the service uses for malformed URLs.
pub const INVALID_URL_BODY: &[u8] = b"Invalid URL supplied";

// The service rejects requests that do not look like they come from its web form.
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Fedora; Linux x86_64; rv:85.0) Gecko/20100101 Firefox/85.0";
const FORM_ORIGIN: &str = "https://pushtokindle.fivefilters.org";
const FORM_REFERER: &str = "https://www.fivefilters.org/push-to-kindle/";

/// Sender configuration.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Service endpoint.
    pub service_url: String,
    /// Request timeout in seconds; an expired attempt is a transient failure.
    pub timeout_secs: u64,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl SenderConfig {
    /// Defaults, with the endpoint taken from `U2K_SERVICE_URL` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(SERVICE_URL_ENV_VAR) {
            let url = url.trim();
            if !url.is_empty() {
                config.service_url = url.to_string();
            }
        }
        config
    }
}

/// Sends one request per [`Deliver::attempt`] call. No retries here.
#[derive(Debug, Clone)]
pub struct PushToKindleClient {
    config: SenderConfig,
    client: Client,
}

impl PushToKindleClient {
    pub fn new(config: SenderConfig) -> DeliveryResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl Deliver for PushToKindleClient {
    async fn attempt(&self, request: &DeliveryRequest) -> Outcome {
        info!(
            url = %request.url(),
            email = %request.recipient_email(),
            from = %request.sender_email(),
            title = %request.title(),
            "Sending url"
        );

        let sent = self
            .client
            .post(&self.config.service_url)
            .query(&[("context", "send"), ("url", request.url())])
            .header(ORIGIN, FORM_ORIGIN)
            .header(REFERER, FORM_REFERER)
            .form(&[
                ("email", request.recipient_email()),
                ("from", request.sender_email()),
                ("title", request.title()),
            ])
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(err) => {
                info!(url = %request.url(), error = %err, "Service unreachable");
                return Outcome::TransientFailure(err.to_string());
            }
        };

        let status = response.status().as_u16();
        let failure_code = response
            .headers()
            .get(FAILURE_HEADER)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).trim().to_string());

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                info!(url = %request.url(), error = %err, "Response body could not be read");
                return Outcome::TransientFailure(err.to_string());
            }
        };

        let outcome = classify_response(status, failure_code.as_deref(), &body);
        debug!(url = %request.url(), status, outcome = %outcome, "Delivery attempt finished");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_service::{MockService, ServiceResponse};
    use crate::RejectReason;

    fn request() -> DeliveryRequest {
        DeliveryRequest::new(
            "https://example.com/a?x=1",
            "reader@kindle.com",
            "me@example.org",
            "Hello World",
        )
    }

    fn client_for(service: &MockService, timeout_secs: u64) -> PushToKindleClient {
        PushToKindleClient::new(SenderConfig {
            service_url: service.url(),
            timeout_secs,
        })
        .unwrap()
    }

    #[test]
    fn test_sender_config_default() {
        let config = SenderConfig::default();
        assert_eq!(config.service_url, DEFAULT_SERVICE_URL);
        assert_eq!(config.timeout_secs, 30);
    }

    #[tokio::test]
    async fn test_request_shape() {
        let service = MockService::start(vec![ServiceResponse::ok("sent")]).await;
        let client = client_for(&service, 5);

        let outcome = client.attempt(&request()).await;
        assert_eq!(outcome, Outcome::Delivered);

        let received = service.received();
        assert_eq!(received.len(), 1);
        let sent = &received[0];
        assert_eq!(sent.method, "POST");
        assert_eq!(
            sent.target,
            "/send.php?context=send&url=https%3A%2F%2Fexample.com%2Fa%3Fx%3D1"
        );
        assert_eq!(
            sent.body,
            "email=reader%40kindle.com&from=me%40example.org&title=Hello+World"
        );
        assert_eq!(sent.header("origin"), Some(FORM_ORIGIN));
        assert_eq!(sent.header("referer"), Some(FORM_REFERER));
        assert_eq!(sent.header("user-agent"), Some(USER_AGENT));
        assert_eq!(
            sent.header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[tokio::test]
    async fn test_blank_sender_and_title_are_sent_empty() {
        let service = MockService::start(vec![ServiceResponse::ok("")]).await;
        let client = client_for(&service, 5);

        let request = DeliveryRequest::new("https://example.com/b", "reader@kindle.com", "", "");
        assert_eq!(client.attempt(&request).await, Outcome::Delivered);

        assert_eq!(
            service.received()[0].body,
            "email=reader%40kindle.com&from=&title="
        );
    }

    #[tokio::test]
    async fn test_failure_header_codes() {
        let service = MockService::start(vec![
            ServiceResponse::failed("1", ""),
            ServiceResponse::failed("2", ""),
            ServiceResponse::failed("9", "try later"),
        ])
        .await;
        let client = client_for(&service, 5);

        assert_eq!(
            client.attempt(&request()).await,
            Outcome::RequestRejected(RejectReason::InvalidRecipient)
        );
        assert_eq!(
            client.attempt(&request()).await,
            Outcome::RequestRejected(RejectReason::TargetNotFound)
        );
        assert_eq!(
            client.attempt(&request()).await,
            Outcome::ServiceReportedUnknown {
                code: "9".to_string(),
                body: "try later".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_url_body() {
        let service = MockService::start(vec![ServiceResponse::ok("Invalid URL supplied")]).await;
        let client = client_for(&service, 5);

        assert_eq!(
            client.attempt(&request()).await,
            Outcome::RequestRejected(RejectReason::InvalidUrl)
        );
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let service = MockService::start(vec![ServiceResponse::status(502)]).await;
        let client = client_for(&service, 5);

        assert!(client.attempt(&request()).await.is_retryable());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = PushToKindleClient::new(SenderConfig {
            service_url: format!("http://{addr}/send.php"),
            timeout_secs: 5,
        })
        .unwrap();

        let outcome = client.attempt(&request()).await;
        assert!(matches!(outcome, Outcome::TransientFailure(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_transient() {
        let service = MockService::start(vec![ServiceResponse::Hang]).await;
        let client = client_for(&service, 1);

        let outcome = client.attempt(&request()).await;
        assert!(matches!(outcome, Outcome::TransientFailure(_)));
    }
}
