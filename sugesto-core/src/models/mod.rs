//! Domain models for Sugesto.
//!
//! This module contains the core data structures representing per-tool
//! usage metering, account profiles, and bulk validation results.
//!
//! ## Submodules
//!
//! - [`usage`] - Usage metering (UsageState)
//! - [`profile`] - Account types (Profile, UserSnapshot)
//! - [`validation`] - Bulk results (EmailValidation, BulkItemResult, BulkRunSummary)

mod profile;
mod usage;
mod validation;

// Re-export everything at the models level
pub use profile::{Profile, UserSnapshot};
pub use usage::{DEFAULT_INITIAL_CREDITS, DEFAULT_TRIALS_LIMIT, UsageState};
pub use validation::{BulkItemResult, BulkRunSummary, EmailValidation, ItemOutcome};
#[cfg(test)]
mod serde_tests;
