//! Account types reported by the backend.

use serde::{Deserialize, Serialize};

/// Usage numbers from the account profile (`GET /auth/me/`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Credits left in the current monthly cycle.
    pub credits_remaining: u64,
    /// Credits spent in the current monthly cycle.
    #[serde(default)]
    pub credits_used: u64,
    /// Lifetime validation count.
    #[serde(default)]
    pub total_checks: u64,
    /// Validations in the current month.
    #[serde(default)]
    pub checks_this_month: u64,
    /// Plan name (e.g. "free").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_type: Option<String>,
}

impl Profile {
    /// Returns true if at least `n` credits remain.
    pub fn can_afford(&self, n: u64) -> bool {
        self.credits_remaining >= n
    }
}

/// The `user` record kept alongside the access tokens.
///
/// Only the identifying fields are typed; the rest of the backend's user
/// object is ignored when read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSnapshot {
    /// Backend user id. Numeric ids are read as their decimal string.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_id"
    )]
    pub id: Option<String>,
    /// Login email.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Whether the email has been verified.
    pub is_verified: bool,
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    }))
}

impl UserSnapshot {
    /// Returns "First Last", falling back to the email.
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }
}
