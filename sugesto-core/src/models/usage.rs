//! Usage-related types.
//!
//! This module contains types related to usage metering:
//! - [`UsageState`] - Trial and credit counters for one tool identifier
//!
//! All timestamps are epoch milliseconds, matching what the metering code
//! reads from its injected clock.

use serde::{Deserialize, Serialize};

use super::profile::Profile;
use crate::error::CoreError;

/// Free invocations an anonymous caller gets per tool.
pub const DEFAULT_TRIALS_LIMIT: u32 = 3;

/// Credits granted to an authenticated caller per cycle.
pub const DEFAULT_INITIAL_CREDITS: u64 = 100;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

fn default_trials_limit() -> u32 {
    DEFAULT_TRIALS_LIMIT
}

// ============================================================================
// Usage State
// ============================================================================

/// Metering state for a single tool identifier.
///
/// One record exists per tool and is persisted as a key-value entry. The
/// trial fields drive anonymous access, the credit fields drive
/// authenticated access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageState {
    /// Stable identifier namespacing this record (e.g. "bulk-checker").
    pub tool_id: String,
    /// Free invocations consumed so far.
    #[serde(default)]
    pub trials_used: u32,
    /// Ceiling on free invocations.
    #[serde(default = "default_trials_limit")]
    pub trials_limit: u32,
    /// When the last trial was consumed.
    #[serde(default)]
    pub last_used_at: Option<i64>,
    /// Credits still spendable.
    #[serde(default)]
    pub credits_available: u64,
    /// Credits spent in the current cycle.
    #[serde(default)]
    pub credits_used: u64,
    /// Credits granted for the current cycle.
    #[serde(default)]
    pub credits_total: u64,
    /// When the credit cycle last rolled over.
    #[serde(default)]
    pub credits_reset_at: Option<i64>,
    /// Credit consumption is refused until this instant.
    #[serde(default)]
    pub rate_limit_reset_at: Option<i64>,
    /// Timestamps of credit consumptions inside the rate-limit window.
    #[serde(default)]
    pub request_history: Vec<i64>,
}

impl UsageState {
    /// Creates a fresh record with no trials used and a full credit grant.
    pub fn new(tool_id: impl Into<String>, trials_limit: u32, initial_credits: u64) -> Self {
        Self {
            tool_id: tool_id.into(),
            trials_used: 0,
            trials_limit,
            last_used_at: None,
            credits_available: initial_credits,
            credits_used: 0,
            credits_total: initial_credits,
            credits_reset_at: None,
            rate_limit_reset_at: None,
            request_history: Vec::new(),
        }
    }

    /// Returns `trials_limit - trials_used`, clamped at zero.
    pub fn remaining_trials(&self) -> u32 {
        self.trials_limit.saturating_sub(self.trials_used)
    }

    /// Returns true once every free invocation has been consumed.
    pub fn trials_exhausted(&self) -> bool {
        self.trials_used >= self.trials_limit
    }

    /// Returns true when no credit is left to spend.
    pub fn credits_exhausted(&self) -> bool {
        self.credits_available == 0
    }

    /// Returns true while a rate-limit window is active at `now_ms`.
    pub fn is_rate_limited(&self, now_ms: i64) -> bool {
        self.rate_limit_reset_at.is_some_and(|reset| now_ms < reset)
    }

    /// Whole seconds until the rate-limit window clears, rounded up.
    ///
    /// Zero once the window has passed or when none is set.
    pub fn rate_limit_reset_seconds(&self, now_ms: i64) -> u64 {
        match self.rate_limit_reset_at {
            Some(reset) if reset > now_ms => u64::try_from(reset - now_ms)
                .unwrap_or(0)
                .div_ceil(1000),
            _ => 0,
        }
    }

    /// Returns true once `cycle_days` have passed since the last credit reset.
    pub fn credit_cycle_elapsed(&self, now_ms: i64, cycle_days: u32) -> bool {
        self.credits_reset_at
            .is_some_and(|reset| now_ms - reset >= i64::from(cycle_days) * MS_PER_DAY)
    }

    /// Drops history entries older than the window and clears an expired
    /// rate-limit deadline.
    pub fn prune_history(&mut self, now_ms: i64, window_ms: i64) {
        self.request_history.retain(|&t| now_ms - t < window_ms);
        if !self.is_rate_limited(now_ms) {
            self.rate_limit_reset_at = None;
        }
    }

    /// Records one consumed trial.
    pub fn record_trial(&mut self, now_ms: i64) {
        self.trials_used = self.trials_used.saturating_add(1);
        self.last_used_at = Some(now_ms);
    }

    /// Records one spent credit and arms the rate limit when the window fills.
    ///
    /// Callers must have checked [`credits_exhausted`](Self::credits_exhausted)
    /// and [`is_rate_limited`](Self::is_rate_limited) first.
    pub fn record_credit(&mut self, now_ms: i64, max_requests: usize, window_ms: i64) {
        self.credits_available = self.credits_available.saturating_sub(1);
        self.credits_used = self.credits_used.saturating_add(1);
        self.request_history.push(now_ms);
        self.rearm_rate_limit(max_requests, window_ms);
    }

    /// Recomputes the rate-limit deadline from the request history.
    ///
    /// A full window arms the limit until its oldest entry expires; any
    /// shorter history clears it.
    pub fn rearm_rate_limit(&mut self, max_requests: usize, window_ms: i64) {
        self.rate_limit_reset_at = if self.request_history.len() >= max_requests {
            self.request_history.iter().min().map(|oldest| oldest + window_ms)
        } else {
            None
        };
    }

    /// Returns true while the credit fields are still a fresh grant of
    /// `initial_credits` with nothing spent.
    pub fn credits_untouched(&self, initial_credits: u64) -> bool {
        self.credits_used == 0
            && self.credits_available == initial_credits
            && self.request_history.is_empty()
    }

    /// Gives back one previously spent credit.
    ///
    /// Returns false when nothing has been spent in this cycle.
    pub fn restore_credit(&mut self) -> bool {
        if self.credits_used == 0 {
            return false;
        }
        self.credits_used -= 1;
        self.credits_available = self.credits_available.saturating_add(1);
        true
    }

    /// Starts a new credit cycle with a full grant.
    pub fn reset_credits(&mut self, initial_credits: u64, now_ms: i64) {
        self.credits_available = initial_credits;
        self.credits_used = 0;
        self.credits_total = initial_credits;
        self.credits_reset_at = Some(now_ms);
        self.request_history.clear();
        self.rate_limit_reset_at = None;
    }

    /// Forgets every consumed trial.
    pub fn reset_trials(&mut self) {
        self.trials_used = 0;
        self.last_used_at = None;
    }

    /// Overwrites the credit fields with the backend's numbers.
    pub fn apply_profile(&mut self, profile: &Profile) {
        self.credits_available = profile.credits_remaining;
        self.credits_used = profile.credits_used;
        self.credits_total = profile.credits_remaining.saturating_add(profile.credits_used);
    }
}

impl UsageState {
    /// Validates the record.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidData` if the tool id is empty or the
    /// credit fields do not add up.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.tool_id.trim().is_empty() {
            return Err(CoreError::InvalidData("empty tool_id".to_string()));
        }
        if self.credits_available.checked_add(self.credits_used) != Some(self.credits_total) {
            return Err(CoreError::InvalidData(format!(
                "credits do not add up: {} available + {} used != {} total",
                self.credits_available, self.credits_used, self.credits_total
            )));
        }
        Ok(())
    }

    /// Repairs a record read from storage.
    ///
    /// - Recomputes `credits_total` from available and used
    /// - Drops history entries from the future
    pub fn sanitize(&mut self, now_ms: i64) {
        self.credits_total = self.credits_available.saturating_add(self.credits_used);
        self.request_history.retain(|&t| t <= now_ms);
    }
}

// ============================================================================
// Tests
// ============================================================================
