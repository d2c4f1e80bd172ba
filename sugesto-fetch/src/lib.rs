// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Sugesto Fetch
//!
//! HTTP client for the Sugesto validation API.
//!
//! This crate provides:
//!
//! - [`client::HttpClient`] - `reqwest` wrapper with tracing, timeouts, and
//!   retries for idempotent reads
//! - [`api::ApiClient`] - Typed endpoints (login, profile, bulk validation)
//! - [`error::FetchError`] - Status-aware error mapping
//!
//! [`ApiClient`] implements the core [`EmailValidator`](sugesto_core::EmailValidator)
//! and [`ProfileSource`](sugesto_core::ProfileSource) traits, so it plugs
//! straight into the bulk runner.
//!
//! ## Example
//!
//! ```ignore
//! use sugesto_fetch::ApiClient;
//!
//! let api = ApiClient::new("http://localhost:8000/api")?.with_token(access);
//! let validation = api.bulk_validate("someone@example.com").await?;
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod retry;

pub use api::{ApiClient, DEFAULT_API_URL, LoginResponse, MeResponse, Tokens};
pub use client::{DEFAULT_TIMEOUT_SECS, HttpClient};
pub use error::{DEFAULT_FAILURE_MESSAGE, FetchError};
pub use retry::RetryStrategy;
