//! Usage meter: free trials for anonymous callers, credits for signed-in ones.
//!
//! Every operation re-reads the stored record, applies time-based upkeep
//! (rate-limit window pruning, monthly credit rollover), and writes back
//! while holding the meter's lock. Two consumes for the same tool can
//! therefore never both pass a limit.
//!
//! Policy violations are returned as values. Storage failures are logged
//! and folded into the same values (`false`, or the message
//! [`STORAGE_FAILURE_MESSAGE`]); nothing here returns a storage error to a
//! caller that is only asking "may I proceed?".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use sugesto_core::{
    Clock, CoreError, DEFAULT_INITIAL_CREDITS, DEFAULT_TRIALS_LIMIT, Profile, UsageState,
    UsageStore,
};
use tracing::{debug, info, warn};

/// Message when credit consumption is attempted without signing in.
pub const AUTH_REQUIRED_MESSAGE: &str = "Authentication required";
/// Message when the credit balance is zero.
pub const NO_CREDITS_MESSAGE: &str = "No credits available. Credits reset monthly.";
/// Message when the store fails during a consume.
pub const STORAGE_FAILURE_MESSAGE: &str = "Error processing request";

/// Formats the rate-limit message for a wait of `seconds`.
pub fn rate_limit_message(seconds: u64) -> String {
    format!("Rate limit exceeded. Please wait {seconds} seconds.")
}

// ============================================================================
// Configuration
// ============================================================================

/// Limits applied by the meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterConfig {
    /// Free invocations per tool for anonymous callers.
    pub trials_limit: u32,
    /// Credit allowance at creation and after each monthly rollover.
    pub initial_credits: u64,
    /// Credit consumptions allowed inside one window.
    pub rate_limit_requests: u32,
    /// Sliding window length in milliseconds.
    pub rate_limit_window_ms: i64,
    /// Days between local credit resets.
    pub credit_cycle_days: u32,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            trials_limit: DEFAULT_TRIALS_LIMIT,
            initial_credits: DEFAULT_INITIAL_CREDITS,
            rate_limit_requests: 3,
            rate_limit_window_ms: 60_000,
            credit_cycle_days: 30,
        }
    }
}

/// Who is using the meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Identity {
    /// Not signed in; trials apply.
    #[default]
    Anonymous,
    /// Signed in; credits apply.
    Authenticated,
}

/// What happens to a reserved credit when the call it paid for fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundPolicy {
    /// The credit stays spent.
    Forfeit,
    /// The credit is released back to the balance.
    #[default]
    RefundOnFailure,
}

impl fmt::Display for RefundPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefundPolicy::Forfeit => write!(f, "forfeit"),
            RefundPolicy::RefundOnFailure => write!(f, "refund_on_failure"),
        }
    }
}

impl std::str::FromStr for RefundPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "forfeit" => Ok(RefundPolicy::Forfeit),
            "refund_on_failure" | "refund" => Ok(RefundPolicy::RefundOnFailure),
            other => Err(format!("unknown refund policy: {other}")),
        }
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Result of a credit consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreditOutcome {
    /// Whether a credit was consumed.
    pub success: bool,
    /// Why not, when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CreditOutcome {
    fn granted() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    fn refused(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// A credit held for one downstream call.
///
/// Pass it to [`UsageMeter::settle`] once the call finishes, or to
/// [`UsageMeter::release`] to give it back unconditionally.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a reservation should be settled or released"]
pub struct CreditReservation {
    tool_id: String,
    reserved_at: i64,
}

impl CreditReservation {
    /// Tool the credit was reserved for.
    pub fn tool_id(&self) -> &str {
        &self.tool_id
    }

    /// When the credit was reserved (epoch ms).
    pub fn reserved_at(&self) -> i64 {
        self.reserved_at
    }
}

/// Pre-invocation decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// The tool may run.
    Proceed,
    /// Anonymous trials are used up; the caller should prompt for sign-up.
    UpgradeRequired,
    /// A credit rule blocks the call.
    Denied(String),
}

// ============================================================================
// Meter
// ============================================================================

/// Trial and credit gate over a [`UsageStore`].
///
/// Meters derived with [`for_identity`](Self::for_identity) share one lock,
/// so every writer over the same store is serialized.
pub struct UsageMeter {
    store: Arc<dyn UsageStore>,
    clock: Arc<dyn Clock>,
    config: MeterConfig,
    identity: Identity,
    lock: Arc<Mutex<()>>,
}

impl fmt::Debug for UsageMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsageMeter")
            .field("config", &self.config)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl UsageMeter {
    /// Creates an anonymous meter.
    pub fn new(store: Arc<dyn UsageStore>, clock: Arc<dyn Clock>, config: MeterConfig) -> Self {
        Self {
            store,
            clock,
            config,
            identity: Identity::Anonymous,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Sets who the meter is acting for.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// Returns a meter over the same store and lock acting for `identity`.
    pub fn for_identity(&self, identity: Identity) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            config: self.config,
            identity,
            lock: Arc::clone(&self.lock),
        }
    }

    /// Returns the identity.
    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Returns the limits in force.
    pub fn config(&self) -> &MeterConfig {
        &self.config
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads the record and applies time-based upkeep.
    ///
    /// Returns the state and whether upkeep changed anything worth saving.
    fn load(&self, tool_id: &str, now: i64) -> Result<(UsageState, bool), CoreError> {
        let (mut state, mut dirty) = match self.store.get(tool_id)? {
            Some(state) => (state, false),
            None => {
                let mut state =
                    UsageState::new(tool_id, self.config.trials_limit, self.config.initial_credits);
                state.credits_reset_at = Some(now);
                (state, false)
            }
        };

        state.tool_id = tool_id.to_string();
        state.trials_limit = self.config.trials_limit;
        state.sanitize(now);

        if state.credit_cycle_elapsed(now, self.config.credit_cycle_days) {
            info!(tool_id, "Credit cycle elapsed, resetting credits");
            state.reset_credits(self.config.initial_credits, now);
            dirty = true;
        }

        let before = state.request_history.len();
        state.prune_history(now, self.config.rate_limit_window_ms);
        dirty |= state.request_history.len() != before;

        Ok((state, dirty))
    }

    fn read(&self, tool_id: &str) -> Result<UsageState, CoreError> {
        let now = self.clock.now_ms();
        let _guard = self.guard();
        let (state, dirty) = self.load(tool_id, now)?;
        if dirty {
            self.store.put(tool_id, &state)?;
        }
        Ok(state)
    }

    fn read_or_log(&self, tool_id: &str) -> Option<UsageState> {
        self.read(tool_id)
            .inspect_err(|e| warn!(tool_id, error = %e, "Failed to read usage record"))
            .ok()
    }

    /// Returns the current record for `tool_id`, created lazily.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn snapshot(&self, tool_id: &str) -> Result<UsageState, CoreError> {
        self.read(tool_id)
    }

    /// Free invocations left.
    pub fn remaining_trials(&self, tool_id: &str) -> u32 {
        self.read_or_log(tool_id)
            .map_or(0, |state| state.remaining_trials())
    }

    /// Whether the caller's allowance is used up.
    ///
    /// Anonymous callers are measured on trials, signed-in callers on
    /// credits. An unreadable record counts as exhausted.
    pub fn has_exceeded_limit(&self, tool_id: &str) -> bool {
        self.read_or_log(tool_id)
            .is_none_or(|state| match self.identity {
                Identity::Anonymous => state.trials_exhausted(),
                Identity::Authenticated => state.credits_exhausted(),
            })
    }

    /// Whether a rate-limit window is active.
    pub fn is_rate_limited(&self, tool_id: &str) -> bool {
        let now = self.clock.now_ms();
        self.read_or_log(tool_id)
            .is_some_and(|state| state.is_rate_limited(now))
    }

    /// Seconds until the rate-limit window clears, 0 when not limited.
    pub fn rate_limit_reset_seconds(&self, tool_id: &str) -> u64 {
        let now = self.clock.now_ms();
        self.read_or_log(tool_id)
            .map_or(0, |state| state.rate_limit_reset_seconds(now))
    }

    /// Consumes one free trial.
    ///
    /// Returns `false` without touching the record when trials are already
    /// exhausted. Otherwise records the trial and returns whether any remain
    /// afterwards; the call that uses the last trial returns `false`.
    pub fn consume_trial(&self, tool_id: &str) -> bool {
        self.try_consume_trial(tool_id).unwrap_or_else(|e| {
            warn!(tool_id, error = %e, "Failed to consume trial");
            false
        })
    }

    /// Like [`consume_trial`](Self::consume_trial), but reports a storage
    /// failure instead of folding it into `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read or written.
    pub fn try_consume_trial(&self, tool_id: &str) -> Result<bool, CoreError> {
        let now = self.clock.now_ms();
        let _guard = self.guard();

        let (mut state, dirty) = self.load(tool_id, now)?;
        if state.trials_exhausted() {
            if dirty {
                self.store.put(tool_id, &state)?;
            }
            debug!(tool_id, "Trial refused, limit reached");
            return Ok(false);
        }

        state.record_trial(now);
        self.store.put(tool_id, &state)?;
        debug!(
            tool_id,
            trials_used = state.trials_used,
            trials_limit = state.trials_limit,
            "Trial consumed"
        );
        Ok(!state.trials_exhausted())
    }

    /// Consumes one credit.
    ///
    /// Checks run in order: identity, rate-limit window, balance.
    pub fn consume_credit(&self, tool_id: &str) -> CreditOutcome {
        match self.take_credit(tool_id) {
            Ok(_) => CreditOutcome::granted(),
            Err(message) => CreditOutcome::refused(message),
        }
    }

    /// Reserves one credit for a downstream call.
    ///
    /// The credit is consumed exactly as [`consume_credit`](Self::consume_credit)
    /// would; the reservation lets the caller give it back.
    ///
    /// # Errors
    ///
    /// Returns the refusal message when no credit can be taken.
    pub fn reserve_credit(&self, tool_id: &str) -> Result<CreditReservation, String> {
        self.take_credit(tool_id)
    }

    /// Returns a reserved credit to the balance.
    ///
    /// Returns true if a credit was restored.
    pub fn release(&self, reservation: CreditReservation) -> bool {
        let now = self.clock.now_ms();
        let _guard = self.guard();
        let tool_id = reservation.tool_id.as_str();

        let result = self.load(tool_id, now).and_then(|(mut state, _)| {
            let restored = state.restore_credit();
            if let Some(pos) = state
                .request_history
                .iter()
                .position(|&t| t == reservation.reserved_at)
            {
                state.request_history.remove(pos);
                state.rearm_rate_limit(
                    self.config.rate_limit_requests as usize,
                    self.config.rate_limit_window_ms,
                );
            }
            self.store.put(tool_id, &state)?;
            Ok(restored)
        });

        match result {
            Ok(restored) => {
                debug!(tool_id, restored, "Credit reservation released");
                restored
            }
            Err(e) => {
                warn!(tool_id, error = %e, "Failed to release credit");
                false
            }
        }
    }

    /// Finishes a reservation once its call is done.
    ///
    /// A successful call keeps the credit spent. A failed call releases it
    /// under [`RefundPolicy::RefundOnFailure`] and keeps it spent under
    /// [`RefundPolicy::Forfeit`]. Returns true if a credit was refunded.
    pub fn settle(
        &self,
        reservation: CreditReservation,
        call_succeeded: bool,
        policy: RefundPolicy,
    ) -> bool {
        match (call_succeeded, policy) {
            (false, RefundPolicy::RefundOnFailure) => self.release(reservation),
            _ => false,
        }
    }

    fn take_credit(&self, tool_id: &str) -> Result<CreditReservation, String> {
        if self.identity == Identity::Anonymous {
            return Err(AUTH_REQUIRED_MESSAGE.to_string());
        }

        let now = self.clock.now_ms();
        let _guard = self.guard();

        let result = self.load(tool_id, now).and_then(|(mut state, dirty)| {
            let refusal = if state.is_rate_limited(now) {
                Some(rate_limit_message(state.rate_limit_reset_seconds(now)))
            } else if state.credits_exhausted() {
                Some(NO_CREDITS_MESSAGE.to_string())
            } else {
                None
            };

            if let Some(message) = refusal {
                if dirty {
                    self.store.put(tool_id, &state)?;
                }
                return Ok(Err(message));
            }

            state.record_credit(
                now,
                self.config.rate_limit_requests as usize,
                self.config.rate_limit_window_ms,
            );
            self.store.put(tool_id, &state)?;
            debug!(
                tool_id,
                credits_available = state.credits_available,
                "Credit consumed"
            );
            Ok(Ok(CreditReservation {
                tool_id: tool_id.to_string(),
                reserved_at: now,
            }))
        });

        match result {
            Ok(outcome) => {
                if let Err(message) = &outcome {
                    debug!(tool_id, message = %message, "Credit refused");
                }
                outcome
            }
            Err(e) => {
                warn!(tool_id, error = %e, "Failed to consume credit");
                Err(STORAGE_FAILURE_MESSAGE.to_string())
            }
        }
    }

    /// Decides whether a tool may run, without consuming anything.
    pub fn authorize(&self, tool_id: &str) -> Gate {
        let now = self.clock.now_ms();
        let Some(state) = self.read_or_log(tool_id) else {
            return Gate::Denied(STORAGE_FAILURE_MESSAGE.to_string());
        };

        match self.identity {
            Identity::Anonymous if state.trials_exhausted() => Gate::UpgradeRequired,
            Identity::Anonymous => Gate::Proceed,
            Identity::Authenticated if state.is_rate_limited(now) => {
                Gate::Denied(rate_limit_message(state.rate_limit_reset_seconds(now)))
            }
            Identity::Authenticated if state.credits_exhausted() => {
                Gate::Denied(NO_CREDITS_MESSAGE.to_string())
            }
            Identity::Authenticated => Gate::Proceed,
        }
    }

    /// Overwrites the credit fields with the backend's numbers.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn apply_profile(&self, tool_id: &str, profile: &Profile) -> Result<UsageState, CoreError> {
        let now = self.clock.now_ms();
        let _guard = self.guard();
        let (mut state, _) = self.load(tool_id, now)?;
        state.apply_profile(profile);
        self.store.put(tool_id, &state)?;
        info!(
            tool_id,
            credits_remaining = profile.credits_remaining,
            "Credits synced from profile"
        );
        Ok(state)
    }

    /// Forgets all trials used for `tool_id`.
    ///
    /// The record is removed outright while its credits are untouched;
    /// otherwise only the trial fields are cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn reset_trials(&self, tool_id: &str) -> Result<(), CoreError> {
        let now = self.clock.now_ms();
        let _guard = self.guard();
        let (mut state, _) = self.load(tool_id, now)?;
        if state.credits_untouched(self.config.initial_credits) {
            self.store.remove(tool_id)?;
            info!(tool_id, "Trial record removed");
        } else {
            state.reset_trials();
            self.store.put(tool_id, &state)?;
            info!(tool_id, "Trials reset");
        }
        Ok(())
    }

    /// Restores the initial credit allowance and clears the rate-limit window.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn reset_credits(&self, tool_id: &str) -> Result<(), CoreError> {
        let now = self.clock.now_ms();
        let _guard = self.guard();
        let (mut state, _) = self.load(tool_id, now)?;
        state.reset_credits(self.config.initial_credits, now);
        self.store.put(tool_id, &state)?;
        info!(tool_id, "Credits reset");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
