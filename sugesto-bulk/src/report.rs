//! CSV report and summary for a finished run.
//!
//! The CSV layout is a user-visible artifact and is written exactly:
//! a fixed header, `Yes`/`No` for booleans, fields joined with `,`, rows
//! joined with `\n`, no trailing newline. Fields are not quoted; commas
//! and line breaks inside text fields become `;` and spaces.

use std::borrow::Cow;
use sugesto_core::{BulkItemResult, BulkRunSummary, ItemOutcome};

/// Header row of the CSV report.
pub const CSV_HEADER: &str = "Email,Valid,Syntax,DNS,SMTP,Disposable,Domain,Error";

/// Renders a boolean as it appears in the report.
pub fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

/// Reads a report boolean back.
pub fn parse_yes_no(field: &str) -> Option<bool> {
    match field {
        "Yes" => Some(true),
        "No" => Some(false),
        _ => None,
    }
}

/// Makes free text safe for an unquoted CSV field.
fn csv_text(value: &str) -> Cow<'_, str> {
    if value.contains([',', '\n', '\r']) {
        Cow::Owned(value.replace(',', ";").replace(['\n', '\r'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

fn csv_row(result: &BulkItemResult) -> String {
    let input = csv_text(&result.input);
    let error = csv_text(result.error_message().unwrap_or(""));
    let domain = csv_text(result.validation().map_or("", |v| v.domain.as_str()));
    let fields: [&str; 8] = match &result.outcome {
        ItemOutcome::Success(v) => [
            input.as_ref(),
            yes_no(v.is_valid),
            yes_no(v.is_valid_syntax),
            yes_no(v.is_valid_dns),
            yes_no(v.is_valid_smtp),
            yes_no(v.is_disposable),
            domain.as_ref(),
            error.as_ref(),
        ],
        ItemOutcome::Failure { .. } => {
            [input.as_ref(), "No", "No", "No", "No", "No", "", error.as_ref()]
        }
    };
    fields.join(",")
}

/// Renders `results` as the CSV report, in the given order.
pub fn export_csv(results: &[BulkItemResult]) -> String {
    std::iter::once(CSV_HEADER.to_string())
        .chain(results.iter().map(csv_row))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Computes the run summary.
///
/// Only calls that returned a valid verdict count as successes.
pub fn summarize(results: &[BulkItemResult]) -> BulkRunSummary {
    BulkRunSummary::from_results(results)
}

/// Download name for a report created at `epoch_ms`.
pub fn report_filename(epoch_ms: i64) -> String {
    format!("bulk-validation-{epoch_ms}.csv")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use sugesto_core::EmailValidation;

    fn validation(valid: bool, smtp: bool, disposable: bool) -> EmailValidation {
        EmailValidation {
            is_valid: valid,
            is_valid_syntax: true,
            is_valid_dns: valid,
            is_valid_smtp: smtp,
            is_disposable: disposable,
            domain: "x.com".to_string(),
            error: None,
            validation_message: None,
            mx_records: vec![],
        }
    }

    #[test]
    fn test_export_exact_layout() {
        let results = vec![
            BulkItemResult::success("a@x.com", validation(true, true, false)),
            BulkItemResult::failure("b@y.com", "Network error"),
        ];
        assert_eq!(
            export_csv(&results),
            "Email,Valid,Syntax,DNS,SMTP,Disposable,Domain,Error\n\
             a@x.com,Yes,Yes,Yes,Yes,No,x.com,\n\
             b@y.com,No,No,No,No,No,,Network error"
        );
    }

    #[test]
    fn test_export_empty_is_header_only() {
        assert_eq!(export_csv(&[]), CSV_HEADER);
    }

    #[test]
    fn test_success_with_error_field() {
        let mut v = validation(false, false, true);
        v.error = Some("SMTP timeout".to_string());
        let csv = export_csv(&[BulkItemResult::success("c@x.com", v)]);
        assert_eq!(csv.lines().nth(1), Some("c@x.com,No,Yes,No,No,Yes,x.com,SMTP timeout"));
    }

    #[test]
    fn test_rate_limited_row_keeps_eight_columns() {
        let csv = export_csv(&[BulkItemResult::failure(
            "d@x.com",
            "Rate limited. Please wait 5 seconds.",
        )]);
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(row.split(',').count(), 8);
        assert!(row.ends_with(",Rate limited. Please wait 5 seconds."));
    }

    #[test]
    fn test_backend_text_with_commas_keeps_eight_columns() {
        let mut v = validation(false, false, false);
        v.error = Some("Connection refused, host unreachable".to_string());
        let csv = export_csv(&[
            BulkItemResult::failure(
                "e@x.com",
                "invalid type: string \"yes\", expected a boolean\nat line 1",
            ),
            BulkItemResult::success("f@x.com", v),
        ]);

        let rows: Vec<&str> = csv.split('\n').collect();
        assert_eq!(rows.len(), 3);
        for row in &rows[1..] {
            assert_eq!(row.split(',').count(), 8);
        }
        assert!(rows[1].ends_with(",invalid type: string \"yes\"; expected a boolean at line 1"));
        assert!(rows[2].ends_with(",Connection refused; host unreachable"));
    }

    #[test]
    fn test_booleans_read_back() {
        let results: Vec<_> = [(true, false, false), (false, true, true), (true, true, true)]
            .into_iter()
            .enumerate()
            .map(|(i, (valid, smtp, disp))| {
                BulkItemResult::success(format!("u{i}@x.com"), validation(valid, smtp, disp))
            })
            .collect();

        let csv = export_csv(&results);
        let lines: Vec<&str> = csv.split('\n').collect();
        assert_eq!(lines.len(), results.len() + 1);

        for (line, result) in lines[1..].iter().zip(&results) {
            let fields: Vec<&str> = line.split(',').collect();
            let v = result.validation().unwrap();
            let parsed: Vec<bool> = fields[1..6].iter().map(|f| parse_yes_no(f).unwrap()).collect();
            assert_eq!(
                parsed,
                vec![
                    v.is_valid,
                    v.is_valid_syntax,
                    v.is_valid_dns,
                    v.is_valid_smtp,
                    v.is_disposable
                ]
            );
        }
    }

    #[test]
    fn test_summarize() {
        let results = vec![
            BulkItemResult::failure("a@x.com", "Network error"),
            BulkItemResult::success("b@x.com", validation(true, false, false)),
            BulkItemResult::success("c@x.com", validation(false, false, false)),
        ];
        let summary = summarize(&results);
        assert_eq!(summary.total_count, 3);
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.failure_count, 2);
        assert_eq!(summary.call_failure_count, 1);
    }

    #[test]
    fn test_report_filename() {
        assert_eq!(report_filename(1_700_000_000_123), "bulk-validation-1700000000123.csv");
        assert_eq!(parse_yes_no("yes"), None);
    }
}
