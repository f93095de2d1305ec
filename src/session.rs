//! In-memory session state with write-through persistence.
//!
//! The [`SessionStore`] is the single authority over the credential pair and
//! the cached profile: every mutation updates the in-memory snapshot and the
//! persisted storage together, and the in-memory side is re-derived from
//! storage at construction. Subscribers observe every change through a
//! watch channel.

use std::sync::RwLock;

use serde::Deserialize;
use tokio::sync::watch;

use crate::storage::{
    ACCESS_TOKEN_KEY, CredentialStorage, REFRESH_TOKEN_KEY, USER_PROFILE_KEY,
};
use crate::types::UserProfile;

/// Access/refresh credential pair as returned by the token endpoints.
///
/// The refresh credential rotates on every successful use; holding on to a
/// stale pair is pointless.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Snapshot of the client session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<UserProfile>,
}

impl Session {
    /// An access credential is present, so requests will carry a bearer
    /// header and the caller is considered signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }
}

/// Shared session state, persisted through a [`CredentialStorage`].
///
/// All gateway invocations read and mutate the same store; writes are
/// last-write-wins. Storage failures degrade to the in-memory state with a
/// `tracing` warning rather than failing the request in flight.
pub struct SessionStore {
    storage: Box<dyn CredentialStorage>,
    state: RwLock<Session>,
    changes: watch::Sender<Session>,
}

impl SessionStore {
    /// Create a store over `storage`, restoring any persisted session into
    /// memory (the app-start re-derivation).
    #[must_use]
    pub fn new(storage: impl CredentialStorage) -> Self {
        let storage = Box::new(storage);
        let restored = Session {
            access_token: read_key(storage.as_ref(), ACCESS_TOKEN_KEY),
            refresh_token: read_key(storage.as_ref(), REFRESH_TOKEN_KEY),
            user: read_key(storage.as_ref(), USER_PROFILE_KEY).and_then(|raw| {
                serde_json::from_str(&raw)
                    .inspect_err(|e| tracing::warn!(error = %e, "discarding cached profile"))
                    .ok()
            }),
        };
        let (changes, _) = watch::channel(restored.clone());
        Self {
            storage,
            state: RwLock::new(restored),
            changes,
        }
    }

    /// Current session snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state.read().expect("session lock poisoned").clone()
    }

    /// Current access credential, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.state
            .read()
            .expect("session lock poisoned")
            .access_token
            .clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state
            .read()
            .expect("session lock poisoned")
            .is_authenticated()
    }

    /// Refresh credential as persisted in storage.
    ///
    /// The refresh protocol reads this from storage rather than from the
    /// in-memory snapshot so that a credential written by a previous process
    /// is honored even before any login in this one.
    #[must_use]
    pub fn persisted_refresh_token(&self) -> Option<String> {
        read_key(self.storage.as_ref(), REFRESH_TOKEN_KEY)
    }

    /// Subscribe to session changes. The receiver yields a fresh snapshot
    /// on every login, rotation, profile update, and clear.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.changes.subscribe()
    }

    /// Install a rotated credential pair, preserving the cached profile.
    pub fn rotate(&self, tokens: &TokenPair) {
        write_key(self.storage.as_ref(), ACCESS_TOKEN_KEY, &tokens.access_token);
        write_key(self.storage.as_ref(), REFRESH_TOKEN_KEY, &tokens.refresh_token);

        let next = {
            let mut state = self.state.write().expect("session lock poisoned");
            state.access_token = Some(tokens.access_token.clone());
            state.refresh_token = Some(tokens.refresh_token.clone());
            state.clone()
        };
        self.changes.send_replace(next);
    }

    /// Cache the user's profile record.
    pub fn store_user(&self, user: UserProfile) {
        match serde_json::to_string(&user) {
            Ok(raw) => write_key(self.storage.as_ref(), USER_PROFILE_KEY, &raw),
            Err(e) => tracing::warn!(error = %e, "profile not persisted"),
        }

        let next = {
            let mut state = self.state.write().expect("session lock poisoned");
            state.user = Some(user);
            state.clone()
        };
        self.changes.send_replace(next);
    }

    /// Wipe the session: credentials and profile, memory and storage.
    ///
    /// This is the sole sign-out primitive; logout, account deactivation,
    /// and failed refreshes all end up here.
    pub fn clear(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_PROFILE_KEY] {
            if let Err(e) = self.storage.remove(key) {
                tracing::error!(key, error = %e, "failed to clear persisted credential");
            }
        }

        let next = {
            let mut state = self.state.write().expect("session lock poisoned");
            *state = Session::default();
            state.clone()
        };
        self.changes.send_replace(next);
    }
}

fn read_key(storage: &dyn CredentialStorage, key: &str) -> Option<String> {
    match storage.get(key) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "credential storage read failed");
            None
        }
    }
}

fn write_key(storage: &dyn CredentialStorage, key: &str, value: &str) {
    if let Err(e) = storage.set(key, value) {
        tracing::error!(key, error = %e, "credential storage write failed");
    }
}
