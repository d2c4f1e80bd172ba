//! Trait definitions for Sugesto.
//!
//! These are the seams between the metering/orchestration logic and the
//! outside world: persistence, time, and the remote API.

use std::fmt;

use chrono::Utc;

use crate::error::CoreError;
use crate::models::{EmailValidation, Profile, UsageState};

/// Persistence for per-tool [`UsageState`] records.
///
/// Reads and writes are synchronous. Implementations need not lock across
/// a get/put pair; the meter serializes read-modify-write itself.
pub trait UsageStore: Send + Sync {
    /// Returns the stored record for `tool_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read or holds a
    /// record that does not parse.
    fn get(&self, tool_id: &str) -> Result<Option<UsageState>, CoreError>;

    /// Stores `state` under `tool_id`, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn put(&self, tool_id: &str, state: &UsageState) -> Result<(), CoreError>;

    /// Removes the record for `tool_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, tool_id: &str) -> Result<(), CoreError>;
}

/// Wall clock in epoch milliseconds.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now_ms(&self) -> i64;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// The remote service that validates one email address per call.
///
/// Implementors are responsible for:
/// - Sending the request with whatever credentials the service needs
/// - Mapping non-2xx statuses to an error carrying a readable message
/// - Rejecting bodies that do not parse as [`EmailValidation`]
pub trait EmailValidator: Send + Sync {
    /// Error returned when the call does not produce a validation.
    type Error: fmt::Display + Send;

    /// Validates a single address.
    fn validate(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<EmailValidation, Self::Error>> + Send;
}

/// Source of fresh account numbers.
pub trait ProfileSource: Send + Sync {
    /// Error returned when the profile cannot be fetched.
    type Error: fmt::Display + Send;

    /// Fetches the current profile.
    fn fetch_profile(
        &self,
    ) -> impl std::future::Future<Output = Result<Profile, Self::Error>> + Send;
}
