//! Bulk error types.

use thiserror::Error;

use crate::preflight::Rejection;
use crate::runner::BulkRunState;

/// Errors that can occur while driving a bulk run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BulkError {
    /// The run was asked to move to a state it cannot reach from here.
    #[error("Invalid bulk run transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: BulkRunState,
        /// Requested state.
        to: BulkRunState,
    },

    /// The batch was refused before any call was made.
    #[error("{0}")]
    Rejected(#[from] Rejection),
}
