//! Typed client for the Sugesto REST API.
//!
//! Endpoints used:
//! - `POST /auth/login/` - exchange credentials for tokens
//! - `GET /auth/me/` - current user and profile
//! - `POST /emails/check/` - validate one address, open to anonymous users
//! - `POST /emails/bulk-validate/` - validate one address, debits one credit
//!
//! Every response is parsed into a concrete type at this boundary. A body
//! that does not match fails the call instead of leaking partial data.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use sugesto_core::{EmailValidation, EmailValidator, Profile, ProfileSource, UserSnapshot};
use tracing::{debug, info};
use url::Url;

use crate::client::{DEFAULT_TIMEOUT_SECS, HttpClient};
use crate::error::FetchError;
use crate::retry::RetryStrategy;

/// Default API base, used when nothing is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

const LOGIN_PATH: &str = "auth/login/";
const ME_PATH: &str = "auth/me/";
const CHECK_PATH: &str = "emails/check/";
const BULK_VALIDATE_PATH: &str = "emails/bulk-validate/";

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct BulkValidateRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct CheckRequest<'a> {
    email: &'a str,
    check_smtp: bool,
}

/// Response of `POST /emails/check/`. It carries no overall verdict.
#[derive(Debug, Deserialize)]
struct CheckResponse {
    email: String,
    is_valid_syntax: bool,
    is_valid_dns: bool,
    is_valid_smtp: bool,
    is_disposable: bool,
    #[serde(default)]
    mx_records: Vec<String>,
    #[serde(default)]
    validation_message: Option<String>,
}

impl From<CheckResponse> for EmailValidation {
    fn from(r: CheckResponse) -> Self {
        let domain = r
            .email
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_string())
            .unwrap_or_default();
        Self {
            is_valid: r.is_valid_syntax && r.is_valid_dns,
            is_valid_syntax: r.is_valid_syntax,
            is_valid_dns: r.is_valid_dns,
            is_valid_smtp: r.is_valid_smtp,
            is_disposable: r.is_disposable,
            domain,
            error: None,
            validation_message: r.validation_message,
            mx_records: r.mx_records,
        }
    }
}

/// Token pair issued at login.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tokens {
    /// Short-lived bearer token.
    pub access: String,
    /// Long-lived refresh token.
    pub refresh: String,
}

/// Response of `POST /auth/login/`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// The signed-in user.
    pub user: UserSnapshot,
    /// Issued tokens.
    pub tokens: Tokens,
}

/// Response of `GET /auth/me/`.
#[derive(Debug, Clone, Deserialize)]
pub struct MeResponse {
    /// The current user.
    #[serde(default)]
    pub user: Option<UserSnapshot>,
    /// Usage numbers; null when the backend has no profile row.
    #[serde(default)]
    pub profile: Option<Profile>,
}

// ============================================================================
// API Client
// ============================================================================

/// Client for the Sugesto API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Creates a client for `base_url` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or the HTTP client
    /// cannot be built.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = HttpClient::with_timeout(timeout)?.with_retry_strategy(RetryStrategy::default());
        Ok(Self {
            http,
            base_url: normalize_base(base_url)?,
            token: None,
        })
    }

    /// Attaches a bearer token to authenticated calls.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Returns true if a bearer token is attached.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Returns the normalized base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        Ok(self.base_url.join(path)?)
    }

    fn require_token(&self) -> Result<&str, FetchError> {
        self.token.as_deref().ok_or(FetchError::NotAuthenticated)
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` on bad credentials, or any transport
    /// or parse error.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, FetchError> {
        let url = self.endpoint(LOGIN_PATH)?;
        let response = self
            .http
            .post_json(&url, None, &LoginRequest { email, password })
            .await?;
        let body = response.text().await?;

        let login: LoginResponse = parse_body(&body)?;
        info!(email = %login.user.email, "Signed in");
        Ok(login)
    }

    /// Fetches the current user and profile.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` without a token, or any transport or
    /// parse error.
    pub async fn me(&self) -> Result<MeResponse, FetchError> {
        let token = self.require_token()?;
        let url = self.endpoint(ME_PATH)?;
        let response = self.http.get_with_bearer(&url, token).await?;
        let body = response.text().await?;
        parse_body(&body)
    }

    /// Validates one address through the public check endpoint.
    ///
    /// Needs no token and debits no credit. The SMTP probe is always
    /// requested.
    ///
    /// # Errors
    ///
    /// Returns the backend's error for non-2xx statuses, `InvalidResponse`
    /// for malformed bodies, or a transport error.
    pub async fn check_email(&self, email: &str) -> Result<EmailValidation, FetchError> {
        let url = self.endpoint(CHECK_PATH)?;
        let request = CheckRequest {
            email,
            check_smtp: true,
        };
        let response = self.http.post_json(&url, None, &request).await?;
        let body = response.text().await?;

        let validation = parse_check(&body)?;
        debug!(email = %email, is_valid = validation.is_valid, "Check received");
        Ok(validation)
    }

    /// Validates one address through the bulk endpoint.
    ///
    /// The backend debits one credit per call. This is never retried.
    ///
    /// # Errors
    ///
    /// Returns the backend's error for non-2xx statuses, `InvalidResponse`
    /// for malformed bodies, or a transport error.
    pub async fn bulk_validate(&self, email: &str) -> Result<EmailValidation, FetchError> {
        let token = self.require_token()?;
        let url = self.endpoint(BULK_VALIDATE_PATH)?;
        let response = self
            .http
            .post_json(&url, Some(token), &BulkValidateRequest { email })
            .await?;
        let body = response.text().await?;

        let validation = parse_validation(&body)?;
        debug!(email = %email, is_valid = validation.is_valid, "Validation received");
        Ok(validation)
    }
}

impl EmailValidator for ApiClient {
    type Error = FetchError;

    async fn validate(&self, email: &str) -> Result<EmailValidation, FetchError> {
        self.bulk_validate(email).await
    }
}

impl ProfileSource for ApiClient {
    type Error = FetchError;

    async fn fetch_profile(&self) -> Result<Profile, FetchError> {
        self.me()
            .await?
            .profile
            .ok_or_else(|| FetchError::InvalidResponse("User profile not found".to_string()))
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Ensures the base URL ends with '/' so relative joins append.
fn normalize_base(base_url: &str) -> Result<Url, FetchError> {
    let trimmed = base_url.trim();
    if trimmed.ends_with('/') {
        Ok(Url::parse(trimmed)?)
    } else {
        Ok(Url::parse(&format!("{trimmed}/"))?)
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| {
        debug!(error = %e, "Response body did not parse");
        FetchError::InvalidResponse("malformed body".to_string())
    })
}

/// Parses and checks a validation body.
pub(crate) fn parse_validation(body: &str) -> Result<EmailValidation, FetchError> {
    let validation: EmailValidation = parse_body(body)?;
    validation.validate()?;
    Ok(validation)
}

/// Parses a check body into a validation with a derived verdict.
fn parse_check(body: &str) -> Result<EmailValidation, FetchError> {
    let check: CheckResponse = parse_body(body)?;
    Ok(check.into())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join_without_trailing_slash() {
        let client = ApiClient::new("https://api.sugesto.xyz/api").unwrap();
        assert_eq!(
            client.endpoint(BULK_VALIDATE_PATH).unwrap().as_str(),
            "https://api.sugesto.xyz/api/emails/bulk-validate/"
        );
    }

    #[test]
    fn test_endpoint_join_with_trailing_slash() {
        let client = ApiClient::new("http://localhost:8000/api/").unwrap();
        assert_eq!(
            client.endpoint(ME_PATH).unwrap().as_str(),
            "http://localhost:8000/api/auth/me/"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticated_calls_need_token() {
        let client = ApiClient::new(DEFAULT_API_URL).unwrap();
        assert!(!client.is_authenticated());
        assert!(matches!(
            client.bulk_validate("a@x.com").await,
            Err(FetchError::NotAuthenticated)
        ));
        assert!(matches!(client.me().await, Err(FetchError::NotAuthenticated)));
    }

    #[test]
    fn test_parse_validation_ok() {
        let body = r#"{
            "email": "a@x.com", "is_valid": false, "is_valid_syntax": true,
            "is_valid_dns": false, "is_valid_smtp": false, "is_disposable": false,
            "domain": "x.com"
        }"#;
        let v = parse_validation(body).unwrap();
        assert!(!v.is_valid);
        assert_eq!(v.domain, "x.com");
    }

    #[test]
    fn test_parse_validation_malformed() {
        assert!(matches!(
            parse_validation("not json"),
            Err(FetchError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_validation(r#"{"is_valid": true}"#),
            Err(FetchError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_validation_inconsistent() {
        let body = r#"{"is_valid": true, "is_valid_syntax": false, "is_valid_dns": true,
                       "is_valid_smtp": true, "is_disposable": false}"#;
        assert!(matches!(parse_validation(body), Err(FetchError::Core(_))));
    }

    #[test]
    fn test_parse_check_derives_verdict() {
        let body = r#"{
            "email": "a@mail.x.com", "is_valid_syntax": true, "is_valid_dns": true,
            "is_valid_smtp": false, "is_disposable": false,
            "mx_records": ["mx1.x.com"], "validation_message": "Mailbox unknown",
            "created_at": "2024-01-01T00:00:00Z", "details": {}
        }"#;
        let v = parse_check(body).unwrap();
        assert!(v.is_valid);
        assert!(!v.is_valid_smtp);
        assert_eq!(v.domain, "mail.x.com");
        assert_eq!(v.mx_records, vec!["mx1.x.com"]);
        assert_eq!(v.validation_message.as_deref(), Some("Mailbox unknown"));

        let body = r#"{"email": "a@nowhere", "is_valid_syntax": true, "is_valid_dns": false,
                       "is_valid_smtp": false, "is_disposable": false}"#;
        assert!(!parse_check(body).unwrap().is_valid);
        assert!(matches!(
            parse_check(r#"{"email": "a@x.com"}"#),
            Err(FetchError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_check_endpoint_path() {
        let client = ApiClient::new(DEFAULT_API_URL).unwrap();
        assert!(!client.is_authenticated());
        assert_eq!(
            client.endpoint(CHECK_PATH).unwrap().as_str(),
            "http://localhost:8000/api/emails/check/"
        );
    }

    #[test]
    fn test_me_response_with_null_profile() {
        let me: MeResponse =
            serde_json::from_str(r#"{"user": {"email": "a@x.com"}, "profile": null}"#).unwrap();
        assert!(me.profile.is_none());
        assert_eq!(me.user.unwrap().email, "a@x.com");
    }

    #[test]
    fn test_malformed_validation_message_is_fixed() {
        let err = parse_validation(r#"{"is_valid": "yes", "is_valid_syntax": true}"#).unwrap_err();
        assert_eq!(err.to_string(), "Invalid response: malformed body");
    }

    #[test]
    fn test_login_response() {
        let body = r#"{
            "user": {"id": "1", "email": "a@x.com", "first_name": "A", "last_name": "B"},
            "tokens": {"access": "acc", "refresh": "ref"}
        }"#;
        let login: LoginResponse = parse_body(body).unwrap();
        assert_eq!(login.tokens.access, "acc");
        assert_eq!(login.user.display_name(), "A B");
    }
}
