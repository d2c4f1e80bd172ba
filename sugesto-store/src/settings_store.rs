//! User preferences store.
//!
//! Settings live in one JSON file. Unknown or missing fields fall back to
//! their defaults, so older files keep loading after new fields are added.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::meter::{MeterConfig, RefundPolicy};
use crate::persistence::{default_settings_path, load_json_if_exists, save_json};

/// Environment variable that overrides [`Settings::api_url`].
pub const API_URL_ENV: &str = "SUGESTO_API_URL";

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

// ============================================================================
// Settings Types
// ============================================================================

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the Sugesto API.
    pub api_url: String,
    /// Free invocations per tool before sign-up is required.
    pub trial_limit: u32,
    /// Credits granted at creation and on each monthly reset.
    pub initial_credits: u64,
    /// Credit consumptions allowed per rate-limit window.
    pub rate_limit_requests: u32,
    /// Rate-limit window in milliseconds.
    pub rate_limit_window_ms: i64,
    /// Days between local credit resets.
    pub credit_cycle_days: u32,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Validation calls in flight during a bulk run.
    pub bulk_concurrency: usize,
    /// What happens to a reserved credit when its call fails.
    pub refund_policy: RefundPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        let meter = MeterConfig::default();
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            trial_limit: meter.trials_limit,
            initial_credits: meter.initial_credits,
            rate_limit_requests: meter.rate_limit_requests,
            rate_limit_window_ms: meter.rate_limit_window_ms,
            credit_cycle_days: meter.credit_cycle_days,
            request_timeout_secs: 30,
            bulk_concurrency: 1,
            refund_policy: RefundPolicy::default(),
        }
    }
}

impl Settings {
    /// Setting names accepted by [`Settings::set`].
    pub const KEYS: &'static [&'static str] = &[
        "api_url",
        "trial_limit",
        "initial_credits",
        "rate_limit_requests",
        "rate_limit_window_ms",
        "credit_cycle_days",
        "request_timeout_secs",
        "bulk_concurrency",
        "refund_policy",
    ];

    /// Returns the meter limits described by these settings.
    pub fn meter_config(&self) -> MeterConfig {
        MeterConfig {
            trials_limit: self.trial_limit,
            initial_credits: self.initial_credits,
            rate_limit_requests: self.rate_limit_requests,
            rate_limit_window_ms: self.rate_limit_window_ms,
            credit_cycle_days: self.credit_cycle_days,
        }
    }

    /// Replaces `api_url` when `value` is a non-empty string.
    pub fn with_api_url_override(mut self, value: Option<String>) -> Self {
        if let Some(url) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            debug!(api_url = %url, "API URL overridden");
            self.api_url = url;
        }
        self
    }

    /// Applies [`API_URL_ENV`] if set.
    pub fn with_env_overrides(self) -> Self {
        self.with_api_url_override(std::env::var(API_URL_ENV).ok())
    }

    /// Sets one field from its string form.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSetting` for a name not in [`Settings::KEYS`] and
    /// `Config` when the value does not parse or fails validation.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, StoreError> {
            value
                .trim()
                .parse()
                .map_err(|_| StoreError::Config(format!("invalid value for {key}: {value:?}")))
        }

        let mut next = self.clone();
        match key {
            "api_url" => next.api_url = value.trim().to_string(),
            "trial_limit" => next.trial_limit = parse(key, value)?,
            "initial_credits" => next.initial_credits = parse(key, value)?,
            "rate_limit_requests" => next.rate_limit_requests = parse(key, value)?,
            "rate_limit_window_ms" => next.rate_limit_window_ms = parse(key, value)?,
            "credit_cycle_days" => next.credit_cycle_days = parse(key, value)?,
            "request_timeout_secs" => next.request_timeout_secs = parse(key, value)?,
            "bulk_concurrency" => next.bulk_concurrency = parse(key, value)?,
            "refund_policy" => {
                next.refund_policy = value.parse().map_err(StoreError::Config)?;
            }
            other => return Err(StoreError::UnknownSetting(other.to_string())),
        }

        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Checks that every field is usable.
    ///
    /// # Errors
    ///
    /// Returns `Config` describing the first bad field.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.api_url.trim().is_empty() {
            return Err(StoreError::Config("api_url must not be empty".to_string()));
        }
        if self.rate_limit_requests == 0 {
            return Err(StoreError::Config(
                "rate_limit_requests must be at least 1".to_string(),
            ));
        }
        if self.rate_limit_window_ms <= 0 {
            return Err(StoreError::Config(
                "rate_limit_window_ms must be positive".to_string(),
            ));
        }
        if self.credit_cycle_days == 0 {
            return Err(StoreError::Config(
                "credit_cycle_days must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(StoreError::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.bulk_concurrency == 0 {
            return Err(StoreError::Config(
                "bulk_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Persistent settings.
#[derive(Debug)]
pub struct SettingsStore {
    settings: Mutex<Settings>,
    path: PathBuf,
}

impl SettingsStore {
    /// Creates a store at `path` holding defaults, without reading the file.
    pub fn new(path: PathBuf) -> Self {
        Self {
            settings: Mutex::new(Settings::default()),
            path,
        }
    }

    /// Loads settings from the default path.
    ///
    /// # Errors
    ///
    /// Returns error if the settings file exists but cannot be read.
    pub fn load_default() -> Result<Self, StoreError> {
        Self::load(default_settings_path())
    }

    /// Loads settings from a path.
    ///
    /// A missing file yields defaults. A file that does not parse, or holds
    /// invalid values, is logged and replaced by defaults in memory.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read.
    pub fn load(path: PathBuf) -> Result<Self, StoreError> {
        let settings = match load_json_if_exists::<Settings>(&path) {
            Ok(Some(settings)) => {
                info!(path = %path.display(), "Loaded settings");
                settings.validate().map_or_else(
                    |e| {
                        warn!(error = %e, "Settings invalid, using defaults");
                        Settings::default()
                    },
                    |()| settings,
                )
            }
            Ok(None) => {
                debug!(path = %path.display(), "Settings file not found, using defaults");
                Settings::default()
            }
            Err(StoreError::Serialization(e)) => {
                warn!(error = %e, "Failed to parse settings, using defaults");
                Settings::default()
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            settings: Mutex::new(settings),
            path,
        })
    }

    /// Returns the settings file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets a copy of the current settings.
    pub fn get(&self) -> Settings {
        self.settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Updates settings in memory.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns; on error the settings are unchanged.
    pub fn update<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Settings) -> Result<(), StoreError>,
    {
        let mut guard = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        f(&mut next)?;
        *guard = next;
        Ok(())
    }

    /// Restores defaults in memory.
    pub fn reset(&self) {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = Settings::default();
    }

    /// Saves settings to disk.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be written to disk.
    pub fn save(&self) -> Result<(), StoreError> {
        let settings = self.get();
        save_json(&self.path, &settings)?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
