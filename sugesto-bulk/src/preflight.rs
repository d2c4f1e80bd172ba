//! Batch-level checks that run before any network call.

use serde::Serialize;
use thiserror::Error;

/// Why a batch was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    /// Nothing to validate.
    #[error("Please provide at least one email address")]
    EmptyInput,

    /// More items than credits.
    #[error("Not enough credits. You need {needed} credits but only have {available} remaining.")]
    InsufficientQuota {
        /// Items in the batch, one credit each.
        needed: usize,
        /// Credits available.
        available: u64,
    },
}

/// Checks that a batch of `item_count` items may start.
///
/// # Errors
///
/// Returns [`Rejection::EmptyInput`] for an empty batch and
/// [`Rejection::InsufficientQuota`] when the batch costs more than
/// `available_quota`.
pub fn preflight_check(item_count: usize, available_quota: u64) -> Result<(), Rejection> {
    if item_count == 0 {
        return Err(Rejection::EmptyInput);
    }
    if !u64::try_from(item_count).is_ok_and(|n| n <= available_quota) {
        return Err(Rejection::InsufficientQuota {
            needed: item_count,
            available: available_quota,
        });
    }
    Ok(())
}
