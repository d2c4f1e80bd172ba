//! CLI output formatting tests.
//!
//! These tests verify that CLI output is correctly formatted for both
//! text and JSON output modes.

#[cfg(test)]
mod text_formatter_tests {
    use super::super::text::TextFormatter;
    use std::path::Path;
    use std::time::Duration;
    use sugesto_bulk::clean_list;
    use sugesto_core::{
        BulkItemResult, BulkRunSummary, EmailValidation, Profile, UsageState, UserSnapshot,
    };
    use sugesto_store::{Identity, Settings};

    const NOW: i64 = 1_700_000_000_000;

    fn validation(valid: bool) -> EmailValidation {
        EmailValidation {
            is_valid: valid,
            is_valid_syntax: true,
            is_valid_dns: valid,
            is_valid_smtp: valid,
            is_disposable: false,
            domain: "example.com".to_string(),
            error: None,
            validation_message: None,
            mx_records: vec!["mx1.example.com".to_string()],
        }
    }

    #[test]
    fn test_progress_bar_boundary_values() {
        let formatter = TextFormatter::new(false);

        let test_cases = vec![
            (0.0, "░░░░░░░░░░"),
            (10.0, "█░░░░░░░░░"),
            (25.0, "███░░░░░░░"), // 2.5 rounds to 3 blocks
            (50.0, "█████░░░░░"),
            (75.0, "████████░░"), // 7.5 rounds to 8 blocks
            (100.0, "██████████"),
        ];

        for (percent, expected) in test_cases {
            let bar = formatter.progress_bar(percent);
            assert_eq!(bar, expected, "Failed for {percent}%");
        }
    }

    #[test]
    fn test_progress_bar_with_colors() {
        let formatter = TextFormatter::new(true);

        // Low remaining (critical) - should be red
        assert!(formatter.progress_bar(10.0).contains("\x1b[31m"));
        // Medium remaining (warning) - should be yellow
        assert!(formatter.progress_bar(40.0).contains("\x1b[33m"));
        // High remaining (good) - should be green
        assert!(formatter.progress_bar(80.0).contains("\x1b[32m"));
    }

    #[test]
    fn test_format_usage_anonymous_hides_credits() {
        let formatter = TextFormatter::new(false);
        let mut state = UsageState::new("list-cleaner", 3, 100);
        state.trials_used = 1;

        let output = formatter.format_usage(&state, Identity::Anonymous, 30, NOW);
        assert!(output.starts_with("list-cleaner"));
        assert!(output.contains("2/3 left"));
        assert!(!output.contains("Credits"));
    }

    #[test]
    fn test_format_usage_signed_in() {
        let formatter = TextFormatter::new(false);
        let mut state = UsageState::new("email-checker", 3, 100);
        state.credits_available = 97;
        state.credits_used = 3;
        state.credits_reset_at = Some(NOW);
        state.rate_limit_reset_at = Some(NOW + 42_000);

        let output = formatter.format_usage(&state, Identity::Authenticated, 30, NOW);
        assert!(output.contains("97/100 left"));
        assert!(output.contains("Rate limited, retry in 42s"));
        assert!(output.contains("Resets"));
    }

    #[test]
    fn test_format_item_lines() {
        let formatter = TextFormatter::new(false);

        let ok = BulkItemResult::success("a@example.com", validation(true));
        assert_eq!(formatter.format_item(0, 12, &ok), "[ 1/12] a@example.com ✓ valid");

        let failed = BulkItemResult::failure("b@example.com", "Network error");
        assert_eq!(
            formatter.format_item(11, 12, &failed),
            "[12/12] b@example.com ✗ Network error"
        );

        let invalid = BulkItemResult::success("c@example.com", validation(false));
        assert!(formatter.format_item(2, 3, &invalid).ends_with("✗ no DNS"));
    }

    #[test]
    fn test_format_bulk_summary() {
        let formatter = TextFormatter::new(false);
        let summary = BulkRunSummary::from_results(&[
            BulkItemResult::success("a@example.com", validation(true)),
            BulkItemResult::success("b@example.com", validation(false)),
            BulkItemResult::failure("c@example.com", "Validation failed"),
        ]);

        let output = formatter.format_bulk_summary(
            &summary,
            Some(Path::new("bulk-validation-1.csv")),
            Duration::from_millis(1500),
        );
        assert!(output.contains("Total:    3"));
        assert!(output.contains("Valid:    1 (33%)"));
        assert!(output.contains("Invalid:  1"));
        assert!(output.contains("Errors:   1"));
        assert!(output.contains("bulk-validation-1.csv"));
    }

    #[test]
    fn test_format_validation() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_validation("a@example.com", &validation(true));
        assert!(output.starts_with("a@example.com valid"));
        assert!(output.contains("mx1.example.com"));
    }

    #[test]
    fn test_format_clean() {
        let formatter = TextFormatter::new(false);
        let stats = clean_list("a@x.com\nA@X.COM\nbad").stats();
        let output = formatter.format_clean(&stats, None);
        assert!(output.contains("Input lines:        3"));
        assert!(output.contains("Duplicates removed: 1"));
        assert!(!output.contains("Saved"));
    }

    #[test]
    fn test_format_profile() {
        let formatter = TextFormatter::new(false);
        let user = UserSnapshot {
            email: "me@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            ..UserSnapshot::default()
        };
        let profile = Profile {
            credits_remaining: 80,
            credits_used: 20,
            total_checks: 140,
            checks_this_month: 20,
            plan_type: Some("free".to_string()),
        };

        let output = formatter.format_profile(Some(&user), &profile);
        assert!(output.starts_with("Ada Lovelace"));
        assert!(output.contains("Email not verified"));
        assert!(output.contains("80/100 left"));
        assert!(output.contains("20 this month, 140 total"));
    }

    #[test]
    fn test_format_settings_lists_every_key() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_settings(&Settings::default());
        for key in Settings::KEYS {
            assert!(output.contains(key), "missing {key}");
        }
        assert!(output.contains("refund_on_failure"));
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::super::json::{BulkOutput, CleanOutput, JsonFormatter};
    use sugesto_bulk::{BulkRun, BulkRunState, Rejection, clean_list};
    use sugesto_core::{BulkItemResult, BulkRunSummary, UsageState};

    #[test]
    fn test_format_pretty_json() {
        let formatter = JsonFormatter::new(true);

        let data = serde_json::json!({"key": "value"});
        let output = formatter.format(&data).unwrap();

        // Pretty output should have newlines
        assert!(output.contains('\n'));
        assert!(output.contains("  ")); // Indentation
    }

    #[test]
    fn test_format_compact_json() {
        let formatter = JsonFormatter::new(false);

        let data = serde_json::json!({"key": "value"});
        let output = formatter.format(&data).unwrap();

        assert_eq!(output, r#"{"key":"value"}"#);
    }

    #[test]
    fn test_format_usage_single_is_object() {
        let formatter = JsonFormatter::new(false);
        let states = [UsageState::new("list-cleaner", 3, 100)];

        let parsed: serde_json::Value =
            serde_json::from_str(&formatter.format_usage(&states, 0).unwrap()).unwrap();
        assert_eq!(parsed["tool"], "list-cleaner");
        assert_eq!(parsed["remainingTrials"], 3);
        assert_eq!(parsed["rateLimited"], false);
    }

    #[test]
    fn test_format_usage_many_is_array() {
        let formatter = JsonFormatter::new(false);
        let states = [
            UsageState::new("bulk-checker", 3, 100),
            UsageState::new("list-cleaner", 3, 100),
        ];

        let parsed: serde_json::Value =
            serde_json::from_str(&formatter.format_usage(&states, 0).unwrap()).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_bulk_output_completed() {
        let results = vec![BulkItemResult::failure("a@x.com", "Network error")];
        let run = BulkRun {
            state: BulkRunState::Completed,
            items: vec!["a@x.com".to_string()],
            summary: Some(BulkRunSummary::from_results(&results)),
            results,
            ..BulkRun::default()
        };

        let mut output = BulkOutput::from_run(&run);
        output.report_path = Some("bulk-validation-1.csv".to_string());
        let value = serde_json::to_value(&output).unwrap();

        assert_eq!(value["state"], "completed");
        assert_eq!(value["summary"]["failure_count"], 1);
        assert_eq!(value["reportPath"], "bulk-validation-1.csv");
        assert_eq!(value["results"][0]["outcome"]["status"], "failure");
        assert!(value.get("rejection").is_none());
    }

    #[test]
    fn test_bulk_output_rejected() {
        let run = BulkRun {
            state: BulkRunState::Rejected,
            rejection: Some(Rejection::InsufficientQuota {
                needed: 4,
                available: 1,
            }),
            ..BulkRun::default()
        };

        let value = serde_json::to_value(BulkOutput::from_run(&run)).unwrap();
        assert_eq!(value["state"], "rejected");
        assert_eq!(value["rejection"]["reason"], "insufficient_quota");
        assert_eq!(value["rejection"]["needed"], 4);
        assert!(value.get("summary").is_none());
    }

    #[test]
    fn test_clean_output() {
        let cleaned = clean_list("a@x.com\nA@X.COM\nnope");
        let value = serde_json::to_value(CleanOutput::from_list(&cleaned)).unwrap();

        assert_eq!(value["stats"]["total_input"], 3);
        assert_eq!(value["clean"][0], "a@x.com");
        assert_eq!(value["duplicates"][0], "A@X.COM");
        assert_eq!(value["invalid"][0], "nope");
    }
}
