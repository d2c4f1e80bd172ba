//! Fetch error types.

use thiserror::Error;

/// Message used when a failed response carries no `error` field.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Validation failed";

/// Error type for API calls.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (connect, TLS, body read).
    #[error("Network error")]
    Http(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limited by the backend (429).
    #[error("{message}")]
    RateLimited {
        /// The body's `error` field, or a message built from `retry_after`.
        message: String,
        /// Seconds to wait before retrying.
        retry_after: Option<u64>,
    },

    /// Token missing, invalid, or expired (401).
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Backend refused the call for lack of credits (402).
    #[error("{0}")]
    InsufficientCredits(String),

    /// Any other non-2xx response.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// The body's `error` field, or a generic message.
        message: String,
    },

    /// Body was not the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] sugesto_core::CoreError),

    /// The configured API base URL does not parse.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A call that needs a bearer token was made without one.
    #[error("Authentication required")]
    NotAuthenticated,
}

impl FetchError {
    /// Builds a 429 error, preferring the backend's own message.
    pub fn rate_limited(message: Option<String>, retry_after: Option<u64>) -> Self {
        let message = message.unwrap_or_else(|| match retry_after {
            Some(secs) => format!("Rate limited. Please wait {secs} seconds."),
            None => "Rate limited".to_string(),
        });
        FetchError::RateLimited {
            message,
            retry_after,
        }
    }

    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(e) => e.is_connect() || e.is_timeout(),
            FetchError::Timeout(_) | FetchError::RateLimited { .. } => true,
            FetchError::Api { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// Returns true if the caller should sign in again.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            FetchError::AuthenticationFailed(_) | FetchError::NotAuthenticated
        )
    }
}
