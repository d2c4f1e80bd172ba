//! Validation result types.
//!
//! This module contains types produced by a bulk run:
//! - [`EmailValidation`] - One validation response, as typed at the boundary
//! - [`ItemOutcome`] - Whether the call itself succeeded
//! - [`BulkItemResult`] - Input plus outcome, kept in input order
//! - [`BulkRunSummary`] - Aggregate counts

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ============================================================================
// Email Validation
// ============================================================================

/// A single email validation response.
///
/// The five boolean checks are required; a response missing any of them is
/// rejected when parsed instead of defaulting to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailValidation {
    /// Overall verdict (syntax and DNS both passed).
    pub is_valid: bool,
    /// Address is syntactically well formed.
    pub is_valid_syntax: bool,
    /// Domain resolves and has mail exchangers.
    pub is_valid_dns: bool,
    /// Mailbox accepted an SMTP probe.
    pub is_valid_smtp: bool,
    /// Domain is a known disposable-mail provider.
    pub is_disposable: bool,
    /// Domain part of the address.
    #[serde(default)]
    pub domain: String,
    /// Error reported alongside an otherwise successful response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Human-readable verdict from the validator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_message: Option<String>,
    /// MX hosts found for the domain.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mx_records: Vec<String>,
}

impl EmailValidation {
    /// Checks that the response is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidData` when the response claims the address
    /// is valid while its syntax check failed.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.is_valid && !self.is_valid_syntax {
            return Err(CoreError::InvalidData(
                "is_valid is true but is_valid_syntax is false".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Bulk Item
// ============================================================================

/// Outcome of one item's validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// The call returned a well-formed validation, positive or negative.
    Success(EmailValidation),
    /// The call itself failed (transport, non-2xx, malformed body).
    Failure {
        /// Human-readable reason.
        message: String,
    },
}

/// Result for one submitted item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItemResult {
    /// The item as submitted, already trimmed.
    pub input: String,
    /// What happened.
    pub outcome: ItemOutcome,
}

impl BulkItemResult {
    /// Creates a result for a call that returned a validation.
    pub fn success(input: impl Into<String>, validation: EmailValidation) -> Self {
        Self {
            input: input.into(),
            outcome: ItemOutcome::Success(validation),
        }
    }

    /// Creates a result for a call that failed.
    pub fn failure(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            outcome: ItemOutcome::Failure {
                message: message.into(),
            },
        }
    }

    /// Returns the validation if the call succeeded.
    pub fn validation(&self) -> Option<&EmailValidation> {
        match &self.outcome {
            ItemOutcome::Success(v) => Some(v),
            ItemOutcome::Failure { .. } => None,
        }
    }

    /// Returns true if the call succeeded and the address is valid.
    pub fn is_valid(&self) -> bool {
        self.validation().is_some_and(|v| v.is_valid)
    }

    /// Returns true if the call itself failed.
    pub fn is_call_failure(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Failure { .. })
    }

    /// Returns the error to show for this item, if any.
    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            ItemOutcome::Success(v) => v.error.as_deref(),
            ItemOutcome::Failure { message } => Some(message),
        }
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Aggregate counts for a finished bulk run.
///
/// `success_count + failure_count == total_count` always holds.
/// `call_failure_count` is the part of `failure_count` where the call
/// itself errored, as opposed to returning a negative validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRunSummary {
    /// Items processed.
    pub total_count: usize,
    /// Calls that succeeded with a valid verdict.
    pub success_count: usize,
    /// Everything else.
    pub failure_count: usize,
    /// Failures where no validation came back at all.
    pub call_failure_count: usize,
}

impl BulkRunSummary {
    /// Computes the summary of `results`.
    pub fn from_results(results: &[BulkItemResult]) -> Self {
        let success_count = results.iter().filter(|r| r.is_valid()).count();
        let call_failure_count = results.iter().filter(|r| r.is_call_failure()).count();

        Self {
            total_count: results.len(),
            success_count,
            failure_count: results.len() - success_count,
            call_failure_count,
        }
    }

    /// Failures where the call succeeded but the address did not validate.
    pub fn invalid_count(&self) -> usize {
        self.failure_count - self.call_failure_count
    }

    /// Percentage of valid items (0-100).
    #[allow(clippy::cast_precision_loss)]
    pub fn success_percent(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            (self.success_count as f64 / self.total_count as f64) * 100.0
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn validation(is_valid: bool) -> EmailValidation {
        EmailValidation {
            is_valid,
            is_valid_syntax: true,
            is_valid_dns: is_valid,
            is_valid_smtp: false,
            is_disposable: false,
            domain: "example.com".to_string(),
            error: None,
            validation_message: None,
            mx_records: vec![],
        }
    }

    #[test]
    fn test_summary_counts_negative_validation_as_failure() {
        let results = vec![
            BulkItemResult::success("a@example.com", validation(true)),
            BulkItemResult::success("b@example.com", validation(false)),
            BulkItemResult::failure("c@example.com", "Network error"),
        ];

        let summary = BulkRunSummary::from_results(&results);
        assert_eq!(summary.total_count, 3);
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.failure_count, 2);
        assert_eq!(summary.call_failure_count, 1);
        assert_eq!(summary.invalid_count(), 1);
        assert_eq!(
            summary.success_count + summary.failure_count,
            summary.total_count
        );
    }

    #[test]
    fn test_summary_empty() {
        let summary = BulkRunSummary::from_results(&[]);
        assert_eq!(summary, BulkRunSummary::default());
        assert_eq!(summary.success_percent(), 0.0);
    }

    #[test]
    fn test_error_message() {
        let ok = BulkItemResult::success("a@example.com", validation(true));
        assert_eq!(ok.error_message(), None);

        let failed = BulkItemResult::failure("a@example.com", "Validation failed");
        assert_eq!(failed.error_message(), Some("Validation failed"));
        assert!(!failed.is_valid());
    }

    #[test]
    fn test_validation_requires_boolean_fields() {
        let json = r#"{"is_valid": true, "is_valid_syntax": true, "domain": "x.com"}"#;
        let parsed: Result<EmailValidation, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validation_consistency() {
        let mut v = validation(true);
        assert!(v.validate().is_ok());
        v.is_valid_syntax = false;
        assert!(v.validate().is_err());
    }
}
