//! HTTP client with tracing and retries for reads.

use reqwest::{Client, Response, StatusCode, header};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{DEFAULT_FAILURE_MESSAGE, FetchError};
use crate::retry::RetryStrategy;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent string for Sugesto.
const USER_AGENT: &str = concat!("sugesto/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper around `reqwest`.
///
/// GET requests are retried per the configured [`RetryStrategy`]. POST
/// requests are sent exactly once.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    timeout: Duration,
    retry_strategy: RetryStrategy,
}

impl HttpClient {
    /// Creates a new HTTP client with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new HTTP client with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            inner: client,
            timeout,
            retry_strategy: RetryStrategy::default(),
        })
    }

    /// Sets the retry strategy for GET requests.
    pub fn with_retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.retry_strategy = strategy;
        self
    }

    /// Performs a GET request with a bearer token, retrying transient failures.
    ///
    /// Returns the response only if its status is 2xx.
    #[instrument(skip(self, token), fields(url = %url))]
    pub async fn get_with_bearer(&self, url: &Url, token: &str) -> Result<Response, FetchError> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(attempt, "GET request");

            let result = self
                .inner
                .get(url.clone())
                .bearer_auth(token)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    debug!(status = %status, "Response received");
                    if status.is_success() {
                        return Ok(response);
                    }

                    if self.retry_strategy.should_retry_status(status)
                        && self.retry_strategy.has_attempts_left(attempt)
                    {
                        let delay = self
                            .retry_strategy
                            .delay_with_hint(attempt, retry_after_secs(&response));
                        warn!(
                            status = %status,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            "Retryable status, waiting before retry"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    return Err(error_from_response(response).await);
                }
                Err(e) => {
                    if self.retry_strategy.has_attempts_left(attempt)
                        && self.retry_strategy.should_retry(&e)
                    {
                        let delay = self.retry_strategy.delay_for_attempt(attempt);
                        warn!(error = %e, delay_secs = delay.as_secs(), "Request failed, retrying");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(self.map_send_error(e));
                }
            }
        }
    }

    /// Performs a single POST request with a JSON body.
    ///
    /// Returns the response only if its status is 2xx.
    #[instrument(skip(self, body, token), fields(url = %url))]
    pub async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        url: &Url,
        token: Option<&str>,
        body: &T,
    ) -> Result<Response, FetchError> {
        debug!("POST request with JSON");

        let mut request = self.inner.post(url.clone()).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        debug!(status = %response.status(), "Response received");

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> FetchError {
        warn!(error = %e, "Request failed");
        if e.is_timeout() {
            FetchError::Timeout(self.timeout.as_secs())
        } else {
            FetchError::Http(e)
        }
    }
}

// ============================================================================
// Error Responses
// ============================================================================

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Extracts the backend's `error` string from a response body.
pub(crate) fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty())
}

/// Maps a non-2xx status and its body to a [`FetchError`].
pub(crate) fn error_for_status(
    status: StatusCode,
    body: &str,
    retry_after: Option<u64>,
) -> FetchError {
    let backend_message = error_message(body);
    if status == StatusCode::TOO_MANY_REQUESTS {
        return FetchError::rate_limited(backend_message, retry_after);
    }
    let message = backend_message.unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());

    match status {
        StatusCode::UNAUTHORIZED => FetchError::AuthenticationFailed(message),
        StatusCode::PAYMENT_REQUIRED => FetchError::InsufficientCredits(message),
        _ => FetchError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

async fn error_from_response(response: Response) -> FetchError {
    let status = response.status();
    let retry_after = retry_after_secs(&response);
    // An unreadable error body still yields a status-based error.
    let body = response.text().await.unwrap_or_default();
    error_for_status(status, &body, retry_after)
}

fn retry_after_secs(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error": "Insufficient credits. Please purchase more credits."}"#),
            Some("Insufficient credits. Please purchase more credits.".to_string())
        );
        assert_eq!(error_message(r#"{"detail": "x"}"#), None);
        assert_eq!(error_message(r#"{"error": "  "}"#), None);
        assert_eq!(error_message("<html>502</html>"), None);
    }

    #[test]
    fn test_error_for_status_mapping() {
        let err = error_for_status(StatusCode::PAYMENT_REQUIRED, r#"{"error":"No credits"}"#, None);
        assert!(matches!(err, FetchError::InsufficientCredits(ref m) if m == "No credits"));

        let err = error_for_status(StatusCode::UNAUTHORIZED, "", None);
        assert!(err.is_auth());

        let err = error_for_status(StatusCode::TOO_MANY_REQUESTS, "", Some(7));
        assert!(matches!(err, FetchError::RateLimited { retry_after: Some(7), .. }));
        assert_eq!(err.to_string(), "Rate limited. Please wait 7 seconds.");
        assert!(!err.to_string().contains(','));
    }

    #[test]
    fn test_rate_limit_prefers_backend_message() {
        let body = r#"{"error": "Too many checks. Try again in a minute."}"#;
        let err = error_for_status(StatusCode::TOO_MANY_REQUESTS, body, Some(60));
        assert_eq!(err.to_string(), "Too many checks. Try again in a minute.");
        assert!(matches!(err, FetchError::RateLimited { retry_after: Some(60), .. }));

        let err = error_for_status(StatusCode::TOO_MANY_REQUESTS, "", None);
        assert_eq!(err.to_string(), "Rate limited");
    }

    #[test]
    fn test_error_for_status_default_message() {
        let err = error_for_status(StatusCode::INTERNAL_SERVER_ERROR, "oops", None);
        assert_eq!(err.to_string(), "Validation failed");
        assert!(matches!(err, FetchError::Api { status: 500, .. }));
    }

    #[test]
    fn test_client_builds() {
        let client = HttpClient::with_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(client.timeout, Duration::from_secs(5));
    }
}
