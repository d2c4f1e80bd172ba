//! CLI command implementations.

pub mod auth;
pub mod bulk;
pub mod check;
pub mod clean;
pub mod config;
pub mod usage;

use anyhow::{Context, Result};
use std::future::Future;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use sugesto_core::{SystemClock, UsageStore};
use sugesto_fetch::{ApiClient, FetchError};
use sugesto_store::{
    FileStorage, Gate, Identity, KeyValueStore, Session, SessionStore, Settings, SettingsStore,
    StorageUsageStore, UsageMeter,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::Cli;

/// Meter key for the bulk checker.
pub const BULK_TOOL_ID: &str = "bulk-checker";
/// Meter key for the list cleaner.
pub const CLEAN_TOOL_ID: &str = "list-cleaner";
/// Meter key for the single-address checker.
pub const CHECK_TOOL_ID: &str = "email-checker";

/// Tools shown by `usage` even before they are first used.
pub const KNOWN_TOOLS: &[&str] = &[BULK_TOOL_ID, CHECK_TOOL_ID, CLEAN_TOOL_ID];

/// Refusals raised by the meter before a tool runs.
#[derive(Debug, Error)]
pub enum GateError {
    /// Anonymous trials are used up.
    #[error("Free trials used up for {0}. Sign in with `sugesto login` to continue.")]
    UpgradeRequired(String),

    /// A credit rule blocks the call.
    #[error("{0}")]
    Denied(String),
}

// ============================================================================
// Context
// ============================================================================

/// Settings, storage, and session shared by the commands.
pub struct AppContext {
    /// Effective settings after environment and flag overrides.
    pub settings: Settings,
    usage: Arc<StorageUsageStore>,
    sessions: SessionStore,
    meter: UsageMeter,
}

impl AppContext {
    /// Builds a context over the given storage.
    pub fn new(settings: Settings, storage: Arc<dyn KeyValueStore>) -> Self {
        let usage = Arc::new(StorageUsageStore::new(Arc::clone(&storage)));
        let meter = UsageMeter::new(
            Arc::clone(&usage) as Arc<dyn UsageStore>,
            Arc::new(SystemClock),
            settings.meter_config(),
        );
        Self {
            settings,
            usage,
            sessions: SessionStore::new(storage),
            meter,
        }
    }

    /// Loads settings and opens local storage at their default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be read.
    pub fn load(cli: &Cli) -> Result<Self> {
        let settings = SettingsStore::load_default()
            .context("Failed to load settings")?
            .get()
            .with_env_overrides()
            .with_api_url_override(cli.api_url.clone());
        let storage = FileStorage::open_default();
        debug!(storage = %storage.path().display(), api_url = %settings.api_url, "Context loaded");
        Ok(Self::new(settings, Arc::new(storage)))
    }

    /// Returns the session store.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Returns the usage records.
    pub fn usage(&self) -> &StorageUsageStore {
        &self.usage
    }

    /// Returns the stored session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn session(&self) -> Result<Option<Session>> {
        Ok(self.sessions.load()?)
    }

    /// Returns the stored session or fails with `NotAuthenticated`.
    ///
    /// # Errors
    ///
    /// Returns an error when nobody is signed in.
    pub fn require_session(&self) -> Result<Session> {
        self.session()?
            .ok_or(FetchError::NotAuthenticated)
            .context("Sign in with `sugesto login` first")
    }

    /// Returns the meter identity for the stored session.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn identity(&self) -> Result<Identity> {
        Ok(if self.sessions.is_authenticated()? {
            Identity::Authenticated
        } else {
            Identity::Anonymous
        })
    }

    /// Returns a meter over local storage acting for `identity`.
    ///
    /// Every meter handed out shares one lock.
    pub fn meter(&self, identity: Identity) -> UsageMeter {
        self.meter.for_identity(identity)
    }

    /// Builds an API client, optionally carrying a bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL is invalid.
    pub fn api_client(&self, token: Option<&str>) -> Result<ApiClient> {
        let client = ApiClient::with_timeout(
            &self.settings.api_url,
            Duration::from_secs(self.settings.request_timeout_secs),
        )
        .with_context(|| format!("Invalid API URL: {}", self.settings.api_url))?;
        Ok(match token {
            Some(token) => client.with_token(token),
            None => client,
        })
    }
}

// ============================================================================
// Input / Output Helpers
// ============================================================================

/// Reads the whole input from `path`, or stdin when `path` is `None` or `-`.
///
/// # Errors
///
/// Returns an error if the file or stdin cannot be read.
pub fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read {}", p.display())),
        _ => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read stdin")?;
            Ok(raw)
        }
    }
}

/// Where a command writes its artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Standard output.
    Stdout,
    /// A file.
    File(PathBuf),
}

impl OutputTarget {
    /// Resolves `--output`, falling back to `default_name` in the current directory.
    pub fn resolve(output: Option<&Path>, default_name: &str) -> Self {
        match output {
            Some(p) if p == Path::new("-") => OutputTarget::Stdout,
            Some(p) => OutputTarget::File(p.to_path_buf()),
            None => OutputTarget::File(PathBuf::from(default_name)),
        }
    }

    /// Writes `contents` to the target.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn write(&self, contents: &str) -> Result<()> {
        match self {
            OutputTarget::Stdout => {
                println!("{contents}");
                Ok(())
            }
            OutputTarget::File(path) => tokio::fs::write(path, contents)
                .await
                .with_context(|| format!("Failed to write {}", path.display())),
        }
    }

    /// Returns the file path, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            OutputTarget::Stdout => None,
            OutputTarget::File(path) => Some(path),
        }
    }
}

// ============================================================================
// Trial Gate
// ============================================================================

/// Shown once the last free trial of a tool has been spent.
pub fn upgrade_notice(tool_id: &str) -> String {
    format!("That was your last free trial of {tool_id}. Sign in with `sugesto login` to keep using it.")
}

/// Refuses to start a tool the meter does not allow.
///
/// # Errors
///
/// Returns `GateError::UpgradeRequired` once trials are used up, or
/// `GateError::Denied` for a credit rule.
pub fn check_gate(meter: &UsageMeter, tool_id: &str) -> Result<(), GateError> {
    match meter.authorize(tool_id) {
        Gate::Proceed => Ok(()),
        Gate::UpgradeRequired => Err(GateError::UpgradeRequired(tool_id.to_string())),
        Gate::Denied(message) => Err(GateError::Denied(message)),
    }
}

/// Runs `call` on a free trial.
///
/// The trial is spent only when `call` succeeds. Returns the value and
/// whether that trial was the last one.
///
/// # Errors
///
/// Returns a `GateError` when no trial is left, or the call's own error.
pub async fn trial_call<T, E, F, Fut>(meter: &UsageMeter, tool_id: &str, call: F) -> Result<(T, bool)>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<anyhow::Error>,
{
    check_gate(meter, tool_id)?;
    let value = call().await.map_err(Into::into)?;
    Ok((value, spend_trial(meter, tool_id)))
}

/// Spends one trial after a successful run.
///
/// Returns true only when that trial was the last one. A storage failure is
/// logged and never reported as the last trial.
pub fn spend_trial(meter: &UsageMeter, tool_id: &str) -> bool {
    match meter.try_consume_trial(tool_id) {
        Ok(trials_left) => {
            debug!(tool_id, trials_left, "Trial spent");
            !trials_left
        }
        Err(e) => {
            warn!(tool_id, error = %e, "Trial was not recorded");
            false
        }
    }
}

/// Current wall time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use sugesto_core::{CoreError, UsageState};
    use sugesto_store::{MemoryStorage, MeterConfig};

    fn context() -> AppContext {
        AppContext::new(Settings::default(), Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_output_target_resolution() {
        assert_eq!(
            OutputTarget::resolve(None, "bulk-validation-1.csv"),
            OutputTarget::File(PathBuf::from("bulk-validation-1.csv"))
        );
        assert_eq!(
            OutputTarget::resolve(Some(Path::new("-")), "x"),
            OutputTarget::Stdout
        );
        assert_eq!(
            OutputTarget::resolve(Some(Path::new("out.csv")), "x").path(),
            Some(Path::new("out.csv"))
        );
    }

    #[tokio::test]
    async fn test_output_target_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        OutputTarget::File(path.clone()).write("a,b").await.unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "a,b");
    }

    #[test]
    fn test_read_input_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");
        std::fs::write(&path, "a@x.com\nb@y.com").unwrap();
        assert_eq!(read_input(Some(&path)).unwrap(), "a@x.com\nb@y.com");
        assert!(read_input(Some(&dir.path().join("missing.txt"))).is_err());
    }

    #[test]
    fn test_identity_follows_session() {
        let ctx = context();
        assert_eq!(ctx.identity().unwrap(), Identity::Anonymous);
        assert!(ctx.require_session().is_err());

        ctx.sessions()
            .save(&Session {
                access_token: "tok".to_string(),
                refresh_token: None,
                user: None,
            })
            .unwrap();
        assert_eq!(ctx.identity().unwrap(), Identity::Authenticated);
        assert_eq!(ctx.require_session().unwrap().access_token, "tok");
    }

    #[test]
    fn test_meter_uses_settings() {
        let mut settings = Settings::default();
        settings.trial_limit = 1;
        let ctx = AppContext::new(settings, Arc::new(MemoryStorage::new()));

        let meter = ctx.meter(Identity::Anonymous);
        assert!(!meter.consume_trial(CLEAN_TOOL_ID));
        assert_eq!(meter.remaining_trials(CLEAN_TOOL_ID), 0);
        assert_eq!(ctx.usage().tool_ids().unwrap(), vec![CLEAN_TOOL_ID]);
    }

    #[tokio::test]
    async fn test_trial_call_flags_last_trial() {
        let meter = context().meter(Identity::Anonymous);

        for last in [false, false, true] {
            let (value, was_last) = trial_call(&meter, CHECK_TOOL_ID, || async {
                Ok::<_, anyhow::Error>("ok")
            })
            .await
            .unwrap();
            assert_eq!(value, "ok");
            assert_eq!(was_last, last);
        }

        let mut called = false;
        let err = trial_call(&meter, CHECK_TOOL_ID, || {
            called = true;
            async { Ok::<_, anyhow::Error>(()) }
        })
        .await
        .unwrap_err();
        assert!(!called);
        assert!(matches!(
            err.downcast_ref::<GateError>(),
            Some(GateError::UpgradeRequired(_))
        ));
    }

    struct ReadOnlyUsage;

    impl UsageStore for ReadOnlyUsage {
        fn get(&self, _: &str) -> Result<Option<UsageState>, CoreError> {
            Ok(None)
        }
        fn put(&self, _: &str, _: &UsageState) -> Result<(), CoreError> {
            Err(CoreError::Storage("read-only".to_string()))
        }
        fn remove(&self, _: &str) -> Result<(), CoreError> {
            Err(CoreError::Storage("read-only".to_string()))
        }
    }

    #[tokio::test]
    async fn test_unrecorded_trial_is_not_the_last() {
        let meter = UsageMeter::new(
            Arc::new(ReadOnlyUsage),
            Arc::new(SystemClock),
            MeterConfig::default(),
        );

        let (_, was_last) = trial_call(&meter, CHECK_TOOL_ID, || async {
            Ok::<_, anyhow::Error>(())
        })
        .await
        .unwrap();
        assert!(!was_last);
        assert!(!spend_trial(&meter, CLEAN_TOOL_ID));
    }

    #[tokio::test]
    async fn test_failed_trial_call_keeps_trial() {
        let meter = context().meter(Identity::Anonymous);
        let result = trial_call(&meter, CHECK_TOOL_ID, || async {
            Err::<(), _>(anyhow::anyhow!("Validation failed"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(meter.remaining_trials(CHECK_TOOL_ID), 3);
    }

    #[test]
    fn test_meters_share_one_lock() {
        let ctx = context();
        let anon = ctx.meter(Identity::Anonymous);
        let user = ctx.meter(Identity::Authenticated);
        anon.consume_trial(CLEAN_TOOL_ID);
        assert_eq!(user.remaining_trials(CLEAN_TOOL_ID), 2);
        assert_eq!(user.identity(), Identity::Authenticated);
    }

    #[test]
    fn test_api_client_rejects_bad_url() {
        let mut settings = Settings::default();
        settings.api_url = "not a url".to_string();
        let ctx = AppContext::new(settings, Arc::new(MemoryStorage::new()));
        assert!(ctx.api_client(None).is_err());
        assert!(context().api_client(Some("tok")).unwrap().is_authenticated());
    }
}
