//! Bulk run driver.
//!
//! A run moves through a fixed set of states:
//!
//! ```text
//! Idle -> Parsing -> PreflightCheck -> Rejected
//!                                   -> Running -> Completed
//! ```
//!
//! Items are fed to the validator through a single-consumer stream. With
//! the default concurrency of one, item N is not sent until item N-1 has
//! been recorded. A wider setting keeps up to N calls in flight but still
//! yields results in input order.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::fmt;
use std::pin::pin;
use std::time::{Duration, Instant};
use sugesto_core::{BulkItemResult, BulkRunSummary, EmailValidator};
use tracing::{debug, info, instrument, warn};

use crate::error::BulkError;
use crate::input::parse_input_list;
use crate::preflight::{Rejection, preflight_check};
use crate::report::summarize;

// ============================================================================
// Run State
// ============================================================================

/// Lifecycle state of one bulk run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkRunState {
    /// Nothing has happened yet.
    #[default]
    Idle,
    /// Raw input is being split into items.
    Parsing,
    /// Item count is being checked against the quota.
    PreflightCheck,
    /// Refused before any call. Terminal.
    Rejected,
    /// Items are being validated.
    Running,
    /// Every item has a result. Terminal.
    Completed,
}

impl BulkRunState {
    /// Returns true if `next` is reachable in one step.
    pub fn can_transition_to(self, next: BulkRunState) -> bool {
        use BulkRunState::{Completed, Idle, Parsing, PreflightCheck, Rejected, Running};
        matches!(
            (self, next),
            (Idle, Parsing)
                | (Parsing, PreflightCheck)
                | (PreflightCheck, Rejected | Running)
                | (Running, Completed)
        )
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns `BulkError::InvalidTransition` if `next` is not reachable.
    pub fn transition(self, next: BulkRunState) -> Result<BulkRunState, BulkError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(BulkError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Returns true for states a run cannot leave.
    pub fn is_terminal(self) -> bool {
        matches!(self, BulkRunState::Rejected | BulkRunState::Completed)
    }
}

impl fmt::Display for BulkRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BulkRunState::Idle => "idle",
            BulkRunState::Parsing => "parsing",
            BulkRunState::PreflightCheck => "preflight_check",
            BulkRunState::Rejected => "rejected",
            BulkRunState::Running => "running",
            BulkRunState::Completed => "completed",
        };
        write!(f, "{name}")
    }
}

// ============================================================================
// Run Record
// ============================================================================

/// Everything known about a run once it stops.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkRun {
    /// Final state, [`BulkRunState::Rejected`] or [`BulkRunState::Completed`].
    pub state: BulkRunState,
    /// Parsed items, in input order.
    pub items: Vec<String>,
    /// One result per item, in input order. Empty when rejected.
    pub results: Vec<BulkItemResult>,
    /// Aggregate counts, present when completed.
    pub summary: Option<BulkRunSummary>,
    /// Why the run was refused, present when rejected.
    pub rejection: Option<Rejection>,
    /// Wall time spent validating.
    #[serde(skip)]
    pub duration: Duration,
}

impl BulkRun {
    /// Returns true if every item was processed.
    pub fn is_completed(&self) -> bool {
        self.state == BulkRunState::Completed
    }

    fn advance(&mut self, next: BulkRunState) -> Result<(), BulkError> {
        self.state = self.state.transition(next)?;
        debug!(state = %self.state, "Bulk run state");
        Ok(())
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Drives bulk runs against an [`EmailValidator`].
#[derive(Debug, Clone)]
pub struct BulkRunner<V> {
    validator: V,
    concurrency: usize,
}

impl<V: EmailValidator> BulkRunner<V> {
    /// Creates a strictly sequential runner.
    pub fn new(validator: V) -> Self {
        Self {
            validator,
            concurrency: 1,
        }
    }

    /// Allows up to `n` calls in flight. Values below 1 mean 1.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Returns the in-flight limit.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the validator.
    pub fn validator(&self) -> &V {
        &self.validator
    }

    async fn validate_item(&self, item: String) -> BulkItemResult {
        match self.validator.validate(&item).await {
            Ok(validation) => BulkItemResult::success(item, validation),
            Err(e) => {
                let message = e.to_string();
                warn!(item = %item, error = %message, "Item validation failed");
                BulkItemResult::failure(item, message)
            }
        }
    }

    /// Validates every item and returns one result per item, in order.
    ///
    /// A failed call becomes that item's `Failure`; it never stops the batch.
    pub async fn run_batch(&self, items: &[String]) -> Vec<BulkItemResult> {
        self.run_batch_with(items, |_, _| {}).await
    }

    /// Like [`run_batch`](Self::run_batch), calling `on_item` as each result
    /// is recorded.
    #[instrument(skip(self, items, on_item), fields(items = items.len(), concurrency = self.concurrency))]
    pub async fn run_batch_with<F>(&self, items: &[String], mut on_item: F) -> Vec<BulkItemResult>
    where
        F: FnMut(usize, &BulkItemResult),
    {
        let mut results = Vec::with_capacity(items.len());
        let mut pending = pin!(
            stream::iter(items.iter().cloned())
                .map(|item| self.validate_item(item))
                .buffered(self.concurrency)
        );

        while let Some(result) = pending.next().await {
            debug!(
                index = results.len(),
                input = %result.input,
                call_failed = result.is_call_failure(),
                "Item recorded"
            );
            on_item(results.len(), &result);
            results.push(result);
        }

        results
    }

    /// Parses `raw`, checks it against `quota`, and validates every item.
    ///
    /// A refused batch is returned in the `Rejected` state without any call
    /// having been made.
    ///
    /// # Errors
    ///
    /// Returns `BulkError::InvalidTransition` only if the state machine is
    /// driven out of order, which this method does not do.
    pub async fn run(&self, raw: &str, quota: u64) -> Result<BulkRun, BulkError> {
        self.run_with(raw, quota, |_, _| {}).await
    }

    /// Like [`run`](Self::run), calling `on_item` as each result is recorded.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn run_with<F>(&self, raw: &str, quota: u64, on_item: F) -> Result<BulkRun, BulkError>
    where
        F: FnMut(usize, &BulkItemResult),
    {
        let mut run = BulkRun::default();

        run.advance(BulkRunState::Parsing)?;
        run.items = parse_input_list(raw);

        run.advance(BulkRunState::PreflightCheck)?;
        if let Err(rejection) = preflight_check(run.items.len(), quota) {
            info!(items = run.items.len(), quota, reason = %rejection, "Bulk run rejected");
            run.advance(BulkRunState::Rejected)?;
            run.rejection = Some(rejection);
            return Ok(run);
        }

        run.advance(BulkRunState::Running)?;
        info!(items = run.items.len(), "Bulk run started");
        let start = Instant::now();
        run.results = self.run_batch_with(&run.items, on_item).await;
        run.duration = start.elapsed();

        let summary = summarize(&run.results);
        run.advance(BulkRunState::Completed)?;
        info!(
            total = summary.total_count,
            valid = summary.success_count,
            failed = summary.failure_count,
            duration_ms = u64::try_from(run.duration.as_millis()).unwrap_or(u64::MAX),
            "Bulk run completed"
        );
        run.summary = Some(summary);
        Ok(run)
    }
}

// ============================================================================
// Tests
// ============================================================================
