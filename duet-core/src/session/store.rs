//! Persisting the authenticated session

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::storage::KeyValueStore;
use crate::model::{Session, User};

/// Key holding the authenticated user
pub const USER_KEY: &str = "current_user";
/// Key holding the fixed recipient
pub const RECIPIENT_KEY: &str = "current_recipient";

/// Restores, persists and clears the session records
pub struct SessionStore<S> {
    backend: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Restore a session if both records are present and well-formed.
    ///
    /// Missing, unreadable or malformed records all mean "no session".
    pub fn restore(&self) -> Option<Session> {
        let user: User = self.read_record(USER_KEY)?;
        let recipient: User = self.read_record(RECIPIENT_KEY)?;
        debug!(user = %user.id, recipient = %recipient.id, "Restored stored session");
        Some(Session::new(user, recipient))
    }

    /// Durably write both records
    pub fn persist(&self, session: &Session) -> crate::Result<()> {
        let user = serde_json::to_string(&session.user)?;
        let recipient = serde_json::to_string(&session.recipient)?;
        self.backend.set(USER_KEY, &user)?;
        self.backend.set(RECIPIENT_KEY, &recipient)?;
        debug!(user = %session.user.id, "Persisted session");
        Ok(())
    }

    /// Remove both records; clearing an empty store is fine
    pub fn clear(&self) -> crate::Result<()> {
        let user_result = self.backend.remove(USER_KEY);
        let recipient_result = self.backend.remove(RECIPIENT_KEY);
        user_result.and(recipient_result)
    }

    fn read_record<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read stored {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring malformed stored {}: {}", key, e);
                None
            }
        }
    }
}
