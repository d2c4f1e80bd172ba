//! Raw list parsing and the list cleaner.
//!
//! Two splitting rules exist:
//! - [`parse_input_list`] accepts newline, comma, and semicolon separators
//!   and keeps duplicates (the bulk checker's input box).
//! - [`clean_list`] takes one item per line and partitions it into clean,
//!   duplicate, and invalid buckets (the list cleaner tool).

use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Basic address shape: something, `@`, something, `.`, something.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"));

/// Returns true if `candidate` has the basic shape of an email address.
pub fn is_plausible_email(candidate: &str) -> bool {
    EMAIL_RE.is_match(candidate)
}

/// Splits raw text on newline, `,` and `;`, trims, and drops empty entries.
///
/// Order and duplicates are kept.
pub fn parse_input_list(raw: &str) -> Vec<String> {
    raw.split(['\n', ',', ';'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// List Cleaner
// ============================================================================

/// The three buckets produced by [`clean_list`].
///
/// Every non-empty input line lands in exactly one bucket, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanedList {
    /// First occurrences that pass the syntax check.
    pub clean: Vec<String>,
    /// Case-insensitive repeats of an earlier line.
    pub duplicates: Vec<String>,
    /// First occurrences that fail the syntax check.
    pub invalid: Vec<String>,
}

/// Counts for a [`CleanedList`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanStats {
    /// Non-empty input lines.
    pub total_input: usize,
    /// Lines kept.
    pub valid_unique: usize,
    /// Repeats removed.
    pub duplicates_removed: usize,
    /// Malformed lines removed.
    pub invalid_removed: usize,
}

impl CleanedList {
    /// Returns the bucket sizes.
    pub fn stats(&self) -> CleanStats {
        CleanStats {
            total_input: self.clean.len() + self.duplicates.len() + self.invalid.len(),
            valid_unique: self.clean.len(),
            duplicates_removed: self.duplicates.len(),
            invalid_removed: self.invalid.len(),
        }
    }

    /// Clean addresses, one per line, without a trailing newline.
    pub fn clean_text(&self) -> String {
        self.clean.join("\n")
    }
}

/// Partitions `raw` into clean, duplicate, and invalid items.
///
/// Lines are trimmed and empty lines dropped. Duplicates are detected before
/// the syntax check, so a repeated malformed line counts once as invalid and
/// then as duplicate.
pub fn clean_list(raw: &str) -> CleanedList {
    let mut seen = HashSet::new();
    let mut cleaned = CleanedList::default();

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !seen.insert(line.to_lowercase()) {
            cleaned.duplicates.push(line.to_string());
        } else if is_plausible_email(line) {
            cleaned.clean.push(line.to_string());
        } else {
            cleaned.invalid.push(line.to_string());
        }
    }

    cleaned
}

/// Download name for a cleaned list created at `epoch_ms`.
pub fn cleaned_filename(epoch_ms: i64) -> String {
    format!("cleaned-emails-{epoch_ms}.txt")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_separators() {
        let items = parse_input_list(" a@x.com, b@y.com;c@z.com\n\n  ;d@w.com  \r\n");
        assert_eq!(items, vec!["a@x.com", "b@y.com", "c@z.com", "d@w.com"]);
    }

    #[test]
    fn test_parse_keeps_duplicates() {
        assert_eq!(parse_input_list("a@x.com\na@x.com"), vec!["a@x.com", "a@x.com"]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_input_list("").is_empty());
        assert!(parse_input_list(" ,;\n ").is_empty());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let raw = "x@a.com; y@b.com,\n z@c.com ,,";
        let once = parse_input_list(raw);
        let twice = parse_input_list(&once.join("\n"));
        assert_eq!(once, twice);
        assert!(!once.is_empty());
    }

    #[test]
    fn test_clean_scenario() {
        let cleaned = clean_list("a@x.com\nA@X.COM\nbad-email\nb@y.com");
        assert_eq!(cleaned.clean, vec!["a@x.com", "b@y.com"]);
        assert_eq!(cleaned.duplicates, vec!["A@X.COM"]);
        assert_eq!(cleaned.invalid, vec!["bad-email"]);
        assert_eq!(
            cleaned.stats(),
            CleanStats {
                total_input: 4,
                valid_unique: 2,
                duplicates_removed: 1,
                invalid_removed: 1
            }
        );
    }

    #[test]
    fn test_clean_repeated_invalid_is_duplicate() {
        let cleaned = clean_list("nope\nNOPE\nnope");
        assert_eq!(cleaned.invalid, vec!["nope"]);
        assert_eq!(cleaned.duplicates, vec!["NOPE", "nope"]);
        assert!(cleaned.clean.is_empty());
    }

    #[test]
    fn test_clean_does_not_split_on_commas() {
        let cleaned = clean_list("a@x.com, b@y.com");
        assert_eq!(cleaned.invalid, vec!["a@x.com, b@y.com"]);
    }

    #[test]
    fn test_clean_partition_property() {
        let raw = "  a@x.com \n\nB@Y.com\nb@y.COM\n@x.com\na@x\nc@d.e\n a@X.com";
        let lines = raw.lines().filter(|l| !l.trim().is_empty()).count();
        let cleaned = clean_list(raw);

        let stats = cleaned.stats();
        assert_eq!(stats.total_input, lines);
        assert_eq!(
            stats.valid_unique + stats.duplicates_removed + stats.invalid_removed,
            lines
        );

        let unique: HashSet<String> = cleaned.clean.iter().map(|c| c.to_lowercase()).collect();
        assert_eq!(unique.len(), cleaned.clean.len());
    }

    #[test]
    fn test_syntax_check() {
        assert!(is_plausible_email("user@example.com"));
        assert!(is_plausible_email("a.b+c@sub.example.co"));
        assert!(!is_plausible_email("user@example"));
        assert!(!is_plausible_email("user @example.com"));
        assert!(!is_plausible_email("user@@example.com"));
        assert!(!is_plausible_email(""));
    }

    #[test]
    fn test_clean_text_and_filename() {
        let cleaned = clean_list("a@x.com\nb@y.com");
        assert_eq!(cleaned.clean_text(), "a@x.com\nb@y.com");
        assert_eq!(cleaned_filename(1_700_000_000_000), "cleaned-emails-1700000000000.txt");
    }
}
