// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Sugesto Bulk
//!
//! Bulk email validation for Sugesto.
//!
//! This crate provides:
//!
//! - [`input`] - Splitting pasted or uploaded lists, and the list cleaner
//! - [`preflight`] - Batch checks made before any call is sent
//! - [`runner`] - The run state machine and the sequential batch loop
//! - [`report`] - CSV export and summary
//!
//! The runner is generic over [`sugesto_core::EmailValidator`], so tests and
//! other callers can supply their own validator.
//!
//! ## Example
//!
//! ```ignore
//! use sugesto_bulk::{BulkRunner, export_csv};
//!
//! let runner = BulkRunner::new(api_client);
//! let run = runner.run("a@x.com\nb@y.com", credits_remaining).await?;
//! if run.is_completed() {
//!     std::fs::write("report.csv", export_csv(&run.results))?;
//! }
//! ```

pub mod error;
pub mod input;
pub mod preflight;
pub mod report;
pub mod runner;

pub use error::BulkError;
pub use input::{
    CleanStats, CleanedList, clean_list, cleaned_filename, is_plausible_email, parse_input_list,
};
pub use preflight::{Rejection, preflight_check};
pub use report::{CSV_HEADER, export_csv, parse_yes_no, report_filename, summarize, yes_no};
pub use runner::{BulkRun, BulkRunState, BulkRunner};
