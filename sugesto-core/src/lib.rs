// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Sugesto Core
//!
//! Core types, models, and traits shared by every Sugesto crate.
//!
//! This crate provides:
//!
//! - Domain models (per-tool usage state, validation results, profiles)
//! - Error types
//! - Seam traits for storage, time, and the remote validation API
//!
//! ## Key Types
//!
//! ### Usage Types
//! - [`UsageState`] - Trial and credit counters for one tool identifier
//! - [`Profile`] - Account numbers reported by the backend
//!
//! ### Validation Types
//! - [`EmailValidation`] - Typed response of a single validation call
//! - [`BulkItemResult`] - One item of a bulk run, success or failure
//! - [`BulkRunSummary`] - Aggregate counts for a finished run
//!
//! ### Traits
//! - [`UsageStore`] - Persistence seam for [`UsageState`]
//! - [`Clock`] - Injected wall clock (epoch milliseconds)
//! - [`EmailValidator`] - The remote validation collaborator
//! - [`ProfileSource`] - Where fresh [`Profile`] numbers come from

pub mod error;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Usage types
    DEFAULT_INITIAL_CREDITS,
    DEFAULT_TRIALS_LIMIT,
    Profile,
    UsageState,
    UserSnapshot,
    // Validation types
    BulkItemResult,
    BulkRunSummary,
    EmailValidation,
    ItemOutcome,
};

// Re-export traits
pub use traits::{Clock, EmailValidator, ProfileSource, SystemClock, UsageStore};
