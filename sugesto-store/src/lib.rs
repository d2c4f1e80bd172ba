// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Sugesto Store
//!
//! Local state for Sugesto.
//!
//! This crate provides:
//!
//! - **Storage**: A `localStorage`-style key-value store, in memory or on disk
//! - **UsageMeter**: Trial and credit gating per tool identifier
//! - **SessionStore**: The signed-in session (`access_token`, `refresh_token`, `user`)
//! - **SettingsStore**: User preferences with persistence
//! - **Persistence**: File I/O helpers for JSON data
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use sugesto_core::SystemClock;
//! use sugesto_store::{FileStorage, MeterConfig, StorageUsageStore, UsageMeter};
//!
//! let storage = Arc::new(FileStorage::open_default());
//! let meter = UsageMeter::new(
//!     Arc::new(StorageUsageStore::new(storage)),
//!     Arc::new(SystemClock),
//!     MeterConfig::default(),
//! );
//!
//! if meter.consume_trial("list-cleaner") {
//!     println!("{} trials left", meter.remaining_trials("list-cleaner"));
//! }
//! ```

pub mod error;
pub mod meter;
pub mod persistence;
pub mod session;
pub mod settings_store;
pub mod storage;
pub mod usage_store;

pub use error::StoreError;
pub use meter::{
    AUTH_REQUIRED_MESSAGE, CreditOutcome, CreditReservation, Gate, Identity, MeterConfig,
    NO_CREDITS_MESSAGE, RefundPolicy, STORAGE_FAILURE_MESSAGE, UsageMeter, rate_limit_message,
};
pub use persistence::{
    default_config_dir, default_data_dir, default_settings_path, default_storage_path, load_json,
    load_json_if_exists, load_json_or_default, save_json,
};
pub use session::{Session, SessionStore};
pub use settings_store::{API_URL_ENV, DEFAULT_API_URL, Settings, SettingsStore};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage};
pub use usage_store::{MemoryUsageStore, StorageUsageStore, USAGE_KEY_PREFIX, usage_key};
