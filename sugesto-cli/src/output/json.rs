//! JSON output formatting.

use anyhow::Result;
use chrono::DateTime;
use serde::{Serialize, Serializer};
use sugesto_bulk::{BulkRun, BulkRunState, CleanStats, CleanedList, Rejection};
use sugesto_core::{BulkItemResult, BulkRunSummary, Profile, UsageState, UserSnapshot};

// ============================================================================
// Output Types
// ============================================================================

/// Meter record for one tool.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageOutput {
    pub tool: String,
    pub trials_used: u32,
    pub trials_limit: u32,
    pub remaining_trials: u32,
    pub credits_available: u64,
    pub credits_used: u64,
    pub credits_total: u64,
    pub rate_limited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_reset_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_millis_opt")]
    pub last_used_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_millis_opt")]
    pub credits_reset_at: Option<i64>,
}

impl UsageOutput {
    /// Builds the output for `state` as seen at `now_ms`.
    pub fn from_state(state: &UsageState, now_ms: i64) -> Self {
        let rate_limited = state.is_rate_limited(now_ms);
        Self {
            tool: state.tool_id.clone(),
            trials_used: state.trials_used,
            trials_limit: state.trials_limit,
            remaining_trials: state.remaining_trials(),
            credits_available: state.credits_available,
            credits_used: state.credits_used,
            credits_total: state.credits_total,
            rate_limited,
            rate_limit_reset_seconds: rate_limited
                .then(|| state.rate_limit_reset_seconds(now_ms)),
            last_used_at: state.last_used_at,
            credits_reset_at: state.credits_reset_at,
        }
    }
}

/// Result of a bulk run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutput<'a> {
    pub state: BulkRunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<&'a BulkRunSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<&'a Rejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_remaining: Option<u64>,
    pub duration_ms: u64,
    pub results: &'a [BulkItemResult],
}

impl<'a> BulkOutput<'a> {
    /// Builds the output for a finished run.
    pub fn from_run(run: &'a BulkRun) -> Self {
        Self {
            state: run.state,
            summary: run.summary.as_ref(),
            rejection: run.rejection.as_ref(),
            report_path: None,
            credits_remaining: None,
            duration_ms: u64::try_from(run.duration.as_millis()).unwrap_or(u64::MAX),
            results: &run.results,
        }
    }
}

/// Result of the list cleaner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanOutput<'a> {
    pub stats: CleanStats,
    pub clean: &'a [String],
    pub duplicates: &'a [String],
    pub invalid: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_trials: Option<u32>,
}

impl<'a> CleanOutput<'a> {
    /// Builds the output for a cleaned list.
    pub fn from_list(list: &'a CleanedList) -> Self {
        Self {
            stats: list.stats(),
            clean: &list.clean,
            duplicates: &list.duplicates,
            invalid: &list.invalid,
            output_path: None,
            remaining_trials: None,
        }
    }
}

/// Signed-in account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<&'a UserSnapshot>,
    pub profile: &'a Profile,
}

// ============================================================================
// Serialization helpers
// ============================================================================

#[allow(clippy::ref_option, clippy::trivially_copy_pass_by_ref)]
fn serialize_millis_opt<S>(ms: &Option<i64>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match ms.and_then(DateTime::from_timestamp_millis) {
        Some(dt) => s.serialize_str(&dt.to_rfc3339()),
        None => s.serialize_none(),
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats meter records, as an object for one tool and an array otherwise.
    pub fn format_usage(&self, states: &[UsageState], now_ms: i64) -> Result<String> {
        let outputs: Vec<UsageOutput> = states
            .iter()
            .map(|state| UsageOutput::from_state(state, now_ms))
            .collect();

        if outputs.len() == 1 {
            self.format(&outputs[0])
        } else {
            self.format(&outputs)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
