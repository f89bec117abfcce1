//! Auth session store: bearer token, refresh token and cached user.
//!
//! The store is the only shared mutable state in the client. Tokens are
//! written through to [`Storage`] under fixed keys so a later process can
//! [`SessionStore::hydrate`] them; the cached user lives in memory only and
//! is repopulated by validating the token against the server.
//!
//! Mutations are last-write-wins. The refresh gate in
//! [`crate::client`] is what keeps concurrent 401s from racing each other.

pub mod storage;

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
use storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_FIXTURE_KEY};

/// Stored access token value that skips server validation.
#[cfg(feature = "testing-bypass")]
pub const TESTING_BYPASS_TOKEN: &str = "fake-jwt-token-for-testing";

/// Cached copy of the server-side user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    /// Display name.
    #[serde(default)]
    pub full_name: String,
    /// Organisation name; the legacy API calls it `organization`.
    #[serde(default, alias = "organization")]
    pub company_name: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "user".to_string()
}

impl User {
    /// Name to greet the user with, or the email address.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.email
        } else {
            &self.full_name
        }
    }
}

/// In-memory view of the current session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub current_user: Option<User>,
}

/// What [`SessionStore::hydrate`] found in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hydration {
    /// No access token stored.
    Anonymous,
    /// A token was loaded; the caller must confirm it with the server.
    NeedsValidation,
    /// Testing bypass: the fixture user was loaded without validation.
    #[cfg(feature = "testing-bypass")]
    Bypassed(User),
}

pub struct SessionStore {
    storage: Arc<dyn Storage>,
    state: RwLock<Session>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage, state: RwLock::new(Session::default()) }
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Load persisted tokens into memory.
    pub fn hydrate(&self) -> Result<Hydration, StorageError> {
        let access = self.storage.get(ACCESS_TOKEN_KEY)?;
        let refresh = self.storage.get(REFRESH_TOKEN_KEY)?;
        debug!(
            backend = self.storage.kind(),
            has_access = access.is_some(),
            has_refresh = refresh.is_some(),
            "session hydrated from storage"
        );

        let Some(access) = access else {
            let mut state = self.write();
            state.access_token = None;
            state.refresh_token = refresh;
            state.current_user = None;
            return Ok(Hydration::Anonymous);
        };

        #[cfg(feature = "testing-bypass")]
        if access == TESTING_BYPASS_TOKEN {
            if let Some(user) = self.bypass_fixture()? {
                tracing::warn!(user_id = user.id, "testing bypass token accepted without validation");
                let mut state = self.write();
                state.access_token = Some(access);
                state.refresh_token = refresh;
                state.current_user = Some(user.clone());
                return Ok(Hydration::Bypassed(user));
            }
        }

        let mut state = self.write();
        state.access_token = Some(access);
        state.refresh_token = refresh;
        state.current_user = None;
        Ok(Hydration::NeedsValidation)
    }

    /// Parsed `exeloka_user` fixture, or `None` when absent/unparsable.
    #[cfg(feature = "testing-bypass")]
    fn bypass_fixture(&self) -> Result<Option<User>, StorageError> {
        let Some(raw) = self.storage.get(USER_FIXTURE_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<User>(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed user fixture");
                Ok(None)
            }
        }
    }

    /// Store a fresh token pair (login, register, refresh).
    ///
    /// Memory is updated first; a storage error only means the pair will
    /// not survive a restart.
    pub fn set_tokens(&self, access: &str, refresh: &str) -> Result<(), StorageError> {
        {
            let mut state = self.write();
            state.access_token = Some(access.to_string());
            state.refresh_token = Some(refresh.to_string());
        }
        self.storage.set(ACCESS_TOKEN_KEY, access)?;
        self.storage.set(REFRESH_TOKEN_KEY, refresh)
    }

    pub fn set_user(&self, user: User) {
        self.write().current_user = Some(user);
    }

    /// Drop all credentials, in memory and in storage.
    ///
    /// Memory is cleared even when storage fails, so a broken disk never
    /// leaves the client sending a revoked token.
    pub fn clear(&self) -> Result<(), StorageError> {
        *self.write() = Session::default();
        let mut first_err = None;
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_FIXTURE_KEY] {
            if let Err(e) = self.storage.remove(key) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn current_access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.read().current_user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().access_token.is_some()
    }

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(entries: &[(&str, &str)]) -> (Arc<MemoryStorage>, SessionStore) {
        let storage = Arc::new(MemoryStorage::with_entries(entries.iter().copied()));
        let store = SessionStore::new(storage.clone());
        (storage, store)
    }

    #[test]
    fn empty_storage_hydrates_anonymous() {
        let (_, store) = store_with(&[]);
        assert_eq!(store.hydrate().unwrap(), Hydration::Anonymous);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn stored_token_needs_validation() {
        let (_, store) = store_with(&[(ACCESS_TOKEN_KEY, "abc"), (REFRESH_TOKEN_KEY, "r")]);
        assert_eq!(store.hydrate().unwrap(), Hydration::NeedsValidation);
        assert_eq!(store.current_access_token().as_deref(), Some("abc"));
        assert_eq!(store.refresh_token().as_deref(), Some("r"));
        assert!(store.current_user().is_none());
    }

    #[test]
    fn set_tokens_writes_through() {
        let (storage, store) = store_with(&[]);
        store.set_tokens("a1", "r1").unwrap();
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("a1"));
        assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("r1"));
        assert_eq!(store.current_access_token().as_deref(), Some("a1"));
    }

    #[test]
    fn clear_removes_every_key() {
        let (storage, store) = store_with(&[(USER_FIXTURE_KEY, "{}")]);
        store.set_tokens("a1", "r1").unwrap();
        store.set_user(User {
            id: 1,
            email: "a@b.c".into(),
            full_name: String::new(),
            company_name: None,
            role: "user".into(),
        });
        store.clear().unwrap();
        assert!(store.snapshot().access_token.is_none());
        assert!(store.current_user().is_none());
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_FIXTURE_KEY] {
            assert_eq!(storage.get(key).unwrap(), None, "{key} should be gone");
        }
    }

    #[test]
    fn user_accepts_legacy_organization_field() {
        let user: User = serde_json::from_str(
            r#"{"id":1,"email":"demo@exeloka.com","full_name":"Demo User","organization":"Demo Org"}"#,
        )
        .unwrap();
        assert_eq!(user.company_name.as_deref(), Some("Demo Org"));
        assert_eq!(user.role, "user");
        assert_eq!(user.display_name(), "Demo User");
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let user: User = serde_json::from_str(r#"{"id":2,"email":"x@y.z"}"#).unwrap();
        assert_eq!(user.display_name(), "x@y.z");
    }

    #[cfg(not(feature = "testing-bypass"))]
    #[test]
    fn bypass_token_is_validated_like_any_other() {
        let (_, store) = store_with(&[
            (ACCESS_TOKEN_KEY, "fake-jwt-token-for-testing"),
            (USER_FIXTURE_KEY, r#"{"id":1,"email":"demo@exeloka.com"}"#),
        ]);
        assert_eq!(store.hydrate().unwrap(), Hydration::NeedsValidation);
        assert!(store.current_user().is_none());
    }

    #[cfg(feature = "testing-bypass")]
    #[test]
    fn bypass_token_hydrates_fixture_user() {
        let (_, store) = store_with(&[
            (ACCESS_TOKEN_KEY, TESTING_BYPASS_TOKEN),
            (USER_FIXTURE_KEY, r#"{"id":7,"email":"demo@exeloka.com","full_name":"Demo"}"#),
        ]);
        match store.hydrate().unwrap() {
            Hydration::Bypassed(user) => assert_eq!(user.id, 7),
            other => panic!("expected bypass, got {other:?}"),
        }
        assert_eq!(store.current_user().map(|u| u.id), Some(7));
    }

    #[cfg(feature = "testing-bypass")]
    #[test]
    fn bypass_with_bad_fixture_falls_through() {
        let (_, store) = store_with(&[
            (ACCESS_TOKEN_KEY, TESTING_BYPASS_TOKEN),
            (USER_FIXTURE_KEY, "not json"),
        ]);
        assert_eq!(store.hydrate().unwrap(), Hydration::NeedsValidation);
    }
}
