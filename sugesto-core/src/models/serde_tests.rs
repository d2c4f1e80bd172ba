//! Serde tests for core types.
//!
//! These pin the JSON shapes that cross a boundary: records written to
//! local storage and payloads read from the backend.

use serde_json::json;

use crate::{
    BulkItemResult, EmailValidation, ItemOutcome, Profile, UsageState, UserSnapshot,
};

// ============================================================================
// UsageState (storage format)
// ============================================================================

#[test]
fn test_usage_state_minimal_record_fills_defaults() {
    let state: UsageState = serde_json::from_value(json!({ "tool_id": "list-cleaner" })).unwrap();

    assert_eq!(state.trials_used, 0);
    assert_eq!(state.trials_limit, 3);
    assert_eq!(state.credits_available, 0);
    assert!(state.request_history.is_empty());
    assert!(state.rate_limit_reset_at.is_none());
}

#[test]
fn test_usage_state_preserves_history() {
    let mut state = UsageState::new("content-generator", 3, 100);
    state.record_credit(1_000, 3, 60_000);
    state.record_trial(2_000);

    let json = serde_json::to_string(&state).unwrap();
    let parsed: UsageState = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, state);
    assert_eq!(parsed.request_history, vec![1_000]);
}

#[test]
fn test_usage_state_rejects_negative_counts() {
    let result: Result<UsageState, _> =
        serde_json::from_value(json!({ "tool_id": "x", "trials_used": -1 }));
    assert!(result.is_err());
}

// ============================================================================
// Validation payloads
// ============================================================================

#[test]
fn test_email_validation_from_backend_payload() {
    let payload = json!({
        "email": "john@example.com",
        "is_valid": true,
        "is_valid_syntax": true,
        "is_valid_dns": true,
        "is_valid_smtp": false,
        "is_disposable": false,
        "domain": "example.com",
        "mx_records": ["mx1.example.com"],
        "validation_message": "Email is valid",
        "details": { "smtp": "skipped" }
    });

    let v: EmailValidation = serde_json::from_value(payload).unwrap();
    assert!(v.is_valid);
    assert_eq!(v.domain, "example.com");
    assert_eq!(v.mx_records, vec!["mx1.example.com".to_string()]);
    assert_eq!(v.error, None);
}

#[test]
fn test_email_validation_wrong_type_rejected() {
    let payload = json!({
        "is_valid": "yes",
        "is_valid_syntax": true,
        "is_valid_dns": true,
        "is_valid_smtp": true,
        "is_disposable": false
    });
    let result: Result<EmailValidation, _> = serde_json::from_value(payload);
    assert!(result.is_err());
}

#[test]
fn test_item_outcome_tagged_shape() {
    let failed = BulkItemResult::failure("a@x.com", "Network error");
    let value = serde_json::to_value(&failed).unwrap();

    assert_eq!(
        value,
        json!({
            "input": "a@x.com",
            "outcome": { "status": "failure", "message": "Network error" }
        })
    );

    let parsed: BulkItemResult = serde_json::from_value(value).unwrap();
    assert!(matches!(parsed.outcome, ItemOutcome::Failure { .. }));
}

// ============================================================================
// Profile / User
// ============================================================================

#[test]
fn test_profile_from_backend_payload() {
    let payload = json!({
        "total_checks": 12,
        "checks_this_month": 4,
        "plan_type": "free",
        "credits_remaining": 96,
        "credits_used": 4
    });

    let profile: Profile = serde_json::from_value(payload).unwrap();
    assert_eq!(profile.credits_remaining, 96);
    assert_eq!(profile.plan_type.as_deref(), Some("free"));
    assert!(profile.can_afford(96));
    assert!(!profile.can_afford(97));
}

#[test]
fn test_profile_requires_credits_remaining() {
    let result: Result<Profile, _> = serde_json::from_value(json!({ "credits_used": 1 }));
    assert!(result.is_err());
}

#[test]
fn test_user_snapshot_ignores_unknown_fields() {
    let payload = json!({
        "id": "7d1f",
        "email": "jane@example.com",
        "first_name": "Jane",
        "last_name": "",
        "company": "Acme",
        "date_joined": "2024-01-01T00:00:00Z"
    });

    let user: UserSnapshot = serde_json::from_value(payload).unwrap();
    assert_eq!(user.email, "jane@example.com");
    assert_eq!(user.display_name(), "Jane");
    assert!(!user.is_verified);
}
