//! Signed-in session.
//!
//! Three storage keys make up a session: `access_token`, `refresh_token`,
//! and `user` (a JSON [`UserSnapshot`]). They are written together at login
//! and cleared together at logout.

use std::sync::Arc;
use sugesto_core::UserSnapshot;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::storage::KeyValueStore;

/// Storage key for the bearer token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Storage key for the user snapshot.
pub const USER_KEY: &str = "user";

/// A signed-in session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token for API calls.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: Option<String>,
    /// Who is signed in, if known.
    pub user: Option<UserSnapshot>,
}

/// Reads and writes the session keys.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates a session store over `storage`.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Loads the current session.
    ///
    /// Without an access token there is no session. An unreadable `user`
    /// value is logged and dropped; the token alone still authenticates.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    pub fn load(&self) -> Result<Option<Session>, StoreError> {
        let Some(access_token) = self
            .storage
            .get_item(ACCESS_TOKEN_KEY)?
            .filter(|t| !t.is_empty())
        else {
            return Ok(None);
        };

        let refresh_token = self.storage.get_item(REFRESH_TOKEN_KEY)?;
        let user = match self.storage.get_item(USER_KEY)? {
            Some(raw) => match serde_json::from_str::<UserSnapshot>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "Stored user snapshot is unreadable");
                    None
                }
            },
            None => None,
        };

        Ok(Some(Session {
            access_token,
            refresh_token,
            user,
        }))
    }

    /// Returns true if a session is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    pub fn is_authenticated(&self) -> Result<bool, StoreError> {
        Ok(self.load()?.is_some())
    }

    /// Stores `session`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or storage fails.
    pub fn save(&self, session: &Session) -> Result<(), StoreError> {
        self.storage.set_item(ACCESS_TOKEN_KEY, &session.access_token)?;
        match &session.refresh_token {
            Some(token) => self.storage.set_item(REFRESH_TOKEN_KEY, token)?,
            None => self.storage.remove_item(REFRESH_TOKEN_KEY)?,
        }
        match &session.user {
            Some(user) => self
                .storage
                .set_item(USER_KEY, &serde_json::to_string(user)?)?,
            None => self.storage.remove_item(USER_KEY)?,
        }

        info!("Session saved");
        Ok(())
    }

    /// Removes all session keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written.
    pub fn clear(&self) -> Result<(), StoreError> {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            self.storage.remove_item(key)?;
        }
        info!("Session cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn session() -> Session {
        Session {
            access_token: "acc".to_string(),
            refresh_token: Some("ref".to_string()),
            user: Some(UserSnapshot {
                email: "a@x.com".to_string(),
                ..UserSnapshot::default()
            }),
        }
    }

    #[test]
    fn test_empty_storage_has_no_session() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        assert_eq!(store.load().unwrap(), None);
        assert!(!store.is_authenticated().unwrap());
    }

    #[test]
    fn test_save_load_clear() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());

        store.save(&session()).unwrap();
        assert_eq!(store.load().unwrap(), Some(session()));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn test_clear_leaves_other_keys() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("sugesto_free_trials_x", "{}").unwrap();
        let store = SessionStore::new(storage.clone());

        store.save(&session()).unwrap();
        store.clear().unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["sugesto_free_trials_x"]);
    }

    #[test]
    fn test_unreadable_user_is_dropped() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(ACCESS_TOKEN_KEY, "acc").unwrap();
        storage.set_item(USER_KEY, "not json").unwrap();

        let loaded = SessionStore::new(storage).load().unwrap().unwrap();
        assert_eq!(loaded.access_token, "acc");
        assert!(loaded.user.is_none());
    }
}
