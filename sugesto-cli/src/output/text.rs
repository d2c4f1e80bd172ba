//! Text output formatting with progress bars and colors.

use chrono::{DateTime, Duration, Local, Utc};
use std::path::Path;
use sugesto_bulk::CleanStats;
use sugesto_core::{
    BulkItemResult, BulkRunSummary, EmailValidation, ItemOutcome, Profile, UsageState,
    UserSnapshot,
};
use sugesto_store::{Identity, Settings};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const BLUE: &str = "\x1b[34m";
const CYAN: &str = "\x1b[36m";

// Progress bar characters
const BAR_FULL: char = '█';
const BAR_EMPTY: char = '░';
const BAR_WIDTH: usize = 10;

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    // ========================================================================
    // Usage
    // ========================================================================

    /// Formats the meter record for one tool.
    pub fn format_usage(
        &self,
        state: &UsageState,
        identity: Identity,
        credit_cycle_days: u32,
        now_ms: i64,
    ) -> String {
        let mut lines = vec![self.bold(&state.tool_id)];

        lines.push(self.format_meter(
            "Trials",
            u64::from(state.remaining_trials()),
            u64::from(state.trials_limit),
        ));

        if identity == Identity::Authenticated {
            lines.push(self.format_meter(
                "Credits",
                state.credits_available,
                state.credits_total,
            ));

            if state.is_rate_limited(now_ms) {
                lines.push(format!(
                    "         {}",
                    self.red(&format!(
                        "Rate limited, retry in {}s",
                        state.rate_limit_reset_seconds(now_ms)
                    ))
                ));
            }

            if let Some(next) = state
                .credits_reset_at
                .and_then(|at| at.checked_add(i64::from(credit_cycle_days) * 86_400_000))
                .and_then(DateTime::from_timestamp_millis)
            {
                lines.push(format!(
                    "         Resets {}",
                    self.dim(&format_reset_time(next, now_ms))
                ));
            }
        }

        if let Some(last) = state.last_used_at.and_then(DateTime::from_timestamp_millis) {
            let local = last.with_timezone(&Local);
            lines.push(format!(
                "Last used: {}",
                self.dim(&local.format("%Y-%m-%d %H:%M").to_string())
            ));
        }

        lines.join("\n")
    }

    /// Formats a "left of total" line with a progress bar.
    fn format_meter(&self, label: &str, remaining: u64, total: u64) -> String {
        let percent = percent_of(remaining, total);
        let bar = self.progress_bar(percent);
        let text = self.color_for_percent(percent, &format!("{remaining}/{total} left"));
        format!("{:<8} {} {}", format!("{label}:"), bar, text)
    }

    /// Formats a progress bar.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn progress_bar(&self, percent_remaining: f64) -> String {
        let percent = percent_remaining.clamp(0.0, 100.0);
        let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
        let empty = BAR_WIDTH.saturating_sub(filled);

        let bar = format!(
            "{}{}",
            BAR_FULL.to_string().repeat(filled),
            BAR_EMPTY.to_string().repeat(empty)
        );

        self.color_for_percent(percent_remaining, &bar)
    }

    // ========================================================================
    // Bulk
    // ========================================================================

    /// Formats the progress line for one recorded item.
    pub fn format_item(&self, index: usize, total: usize, result: &BulkItemResult) -> String {
        let width = total.to_string().len();
        let position = self.dim(&format!("[{:>width$}/{total}]", index + 1));
        let verdict = match &result.outcome {
            ItemOutcome::Success(v) if v.is_valid => self.green("✓ valid"),
            ItemOutcome::Success(v) => {
                let reason = v.error.as_deref().unwrap_or_else(|| invalid_reason(v));
                self.yellow(&format!("✗ {reason}"))
            }
            ItemOutcome::Failure { message } => self.red(&format!("✗ {message}")),
        };
        format!("{position} {} {verdict}", result.input)
    }

    /// Formats the end-of-run summary.
    #[allow(clippy::cast_precision_loss)]
    pub fn format_bulk_summary(
        &self,
        summary: &BulkRunSummary,
        report: Option<&Path>,
        duration: std::time::Duration,
    ) -> String {
        let mut lines = Vec::new();

        lines.push(self.bold("Bulk Validation Summary"));
        lines.push("─".repeat(40));
        lines.push(format!("Total:    {}", summary.total_count));
        lines.push(format!(
            "Valid:    {} ({:.0}%)",
            self.green(&summary.success_count.to_string()),
            summary.success_percent()
        ));
        lines.push(format!(
            "Invalid:  {}",
            self.yellow(&summary.invalid_count().to_string())
        ));
        if summary.call_failure_count > 0 {
            lines.push(format!(
                "Errors:   {}",
                self.red(&summary.call_failure_count.to_string())
            ));
        }
        lines.push(format!(
            "Duration: {}",
            self.dim(&format!("{:.1}s", duration.as_secs_f64()))
        ));

        if let Some(path) = report {
            lines.push(String::new());
            lines.push(format!("Report:   {}", self.cyan(&path.display().to_string())));
        }

        lines.join("\n")
    }

    /// Formats one validation verdict.
    pub fn format_validation(&self, email: &str, v: &EmailValidation) -> String {
        let check = |ok: bool| {
            if ok {
                self.green("✓")
            } else {
                self.red("✗")
            }
        };

        let mut lines = vec![format!(
            "{} {}",
            self.bold(email),
            if v.is_valid {
                self.green("valid")
            } else {
                self.red("invalid")
            }
        )];
        lines.push(format!("Syntax:     {}", check(v.is_valid_syntax)));
        lines.push(format!("DNS:        {}", check(v.is_valid_dns)));
        lines.push(format!("SMTP:       {}", check(v.is_valid_smtp)));
        lines.push(format!(
            "Disposable: {}",
            if v.is_disposable {
                self.yellow("yes")
            } else {
                "no".to_string()
            }
        ));
        if !v.domain.is_empty() {
            lines.push(format!("Domain:     {}", self.cyan(&v.domain)));
        }
        if !v.mx_records.is_empty() {
            lines.push(format!("MX:         {}", v.mx_records.join(", ")));
        }
        if let Some(message) = v.error.as_deref().or(v.validation_message.as_deref()) {
            lines.push(format!("Note:       {}", self.dim(message)));
        }

        lines.join("\n")
    }

    // ========================================================================
    // Cleaner
    // ========================================================================

    /// Formats list cleaner counts.
    pub fn format_clean(&self, stats: &CleanStats, output: Option<&Path>) -> String {
        let mut lines = Vec::new();

        lines.push(self.bold("List Cleaner"));
        lines.push("─".repeat(40));
        lines.push(format!("Input lines:        {}", stats.total_input));
        lines.push(format!(
            "Valid unique:       {}",
            self.green(&stats.valid_unique.to_string())
        ));
        lines.push(format!(
            "Duplicates removed: {}",
            self.yellow(&stats.duplicates_removed.to_string())
        ));
        lines.push(format!(
            "Invalid removed:    {}",
            self.red(&stats.invalid_removed.to_string())
        ));

        if let Some(path) = output {
            lines.push(String::new());
            lines.push(format!("Saved: {}", self.cyan(&path.display().to_string())));
        }

        lines.join("\n")
    }

    // ========================================================================
    // Account
    // ========================================================================

    /// Formats the signed-in account.
    pub fn format_profile(&self, user: Option<&UserSnapshot>, profile: &Profile) -> String {
        let mut lines = Vec::new();

        if let Some(user) = user {
            lines.push(self.bold(&user.display_name()));
            lines.push(format!("Account: {}", self.cyan(&user.email)));
            if !user.is_verified {
                lines.push(format!("         {}", self.yellow("Email not verified")));
            }
        }
        if let Some(plan) = &profile.plan_type {
            lines.push(format!("Plan:    {}", self.blue(plan)));
        }

        let total = profile.credits_remaining + profile.credits_used;
        lines.push(self.format_meter("Credits", profile.credits_remaining, total));
        lines.push(format!(
            "Checks:  {} this month, {} total",
            profile.checks_this_month, profile.total_checks
        ));

        lines.join("\n")
    }

    /// Formats settings as `key = value` lines.
    pub fn format_settings(&self, settings: &Settings) -> String {
        let rows = [
            ("api_url", settings.api_url.clone()),
            ("trial_limit", settings.trial_limit.to_string()),
            ("initial_credits", settings.initial_credits.to_string()),
            ("rate_limit_requests", settings.rate_limit_requests.to_string()),
            ("rate_limit_window_ms", settings.rate_limit_window_ms.to_string()),
            ("credit_cycle_days", settings.credit_cycle_days.to_string()),
            ("request_timeout_secs", settings.request_timeout_secs.to_string()),
            ("bulk_concurrency", settings.bulk_concurrency.to_string()),
            ("refund_policy", settings.refund_policy.to_string()),
        ];

        let mut lines = vec![self.bold("Sugesto Configuration"), "─".repeat(40)];
        lines.extend(
            rows.iter()
                .map(|(key, value)| format!("{key:<22} {}", self.cyan(value))),
        );
        lines.join("\n")
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn color_for_percent(&self, percent: f64, text: &str) -> String {
        if !self.use_colors {
            return text.to_string();
        }

        if percent < 20.0 {
            self.red(text)
        } else if percent < 50.0 {
            self.yellow(text)
        } else {
            self.green(text)
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn blue(&self, text: &str) -> String {
        self.paint(BLUE, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

/// Share of `total` left, as 0-100. An empty total reads as fully used.
#[allow(clippy::cast_precision_loss)]
fn percent_of(remaining: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (remaining as f64 / total as f64) * 100.0
    }
}

/// First failed check, for an invalid verdict without an error string.
fn invalid_reason(v: &EmailValidation) -> &'static str {
    if !v.is_valid_syntax {
        "bad syntax"
    } else if !v.is_valid_dns {
        "no DNS"
    } else if !v.is_valid_smtp {
        "SMTP check failed"
    } else if v.is_disposable {
        "disposable"
    } else {
        "invalid"
    }
}

/// Formats a reset time as a countdown or a date.
fn format_reset_time(resets_at: DateTime<Utc>, now_ms: i64) -> String {
    let Some(now) = DateTime::from_timestamp_millis(now_ms) else {
        return resets_at.to_rfc3339();
    };

    if resets_at <= now {
        return "now".to_string();
    }

    let diff = resets_at - now;
    if diff < Duration::hours(1) {
        let mins = diff.num_minutes();
        format!("in {} minute{}", mins, if mins == 1 { "" } else { "s" })
    } else if diff < Duration::hours(24) {
        let hours = diff.num_hours();
        format!("in {} hour{}", hours, if hours == 1 { "" } else { "s" })
    } else if diff < Duration::days(7) {
        let days = diff.num_days();
        format!("in {} day{}", days, if days == 1 { "" } else { "s" })
    } else {
        resets_at
            .with_timezone(&Local)
            .format("%b %e")
            .to_string()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// Tests
// ============================================================================
