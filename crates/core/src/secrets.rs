//! Session secret store
//!
//! Process-wide mapping from a QR start token to the rotating-code secret
//! the provider issued for that order. Exists solely so the QR refresh
//! loop can look the secret up each tick; it is cleared - deleted, not
//! overwritten - on every terminal transition and before a successor
//! session registers its own secret.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use idport_domain::SecretString;

/// Mutex-guarded start-token to secret map
///
/// One store instance is shared by the orchestrator and its refresh loop.
/// Reads may observe a value at most one refresh interval stale; `clear`
/// is strict so a superseded session's secret can never produce a code.
#[derive(Debug, Default)]
pub struct SessionSecretStore {
    inner: Mutex<HashMap<String, SecretString>>,
}

impl SessionSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the secret for a start token
    pub fn put(&self, start_token: impl Into<String>, secret: SecretString) {
        self.guard().insert(start_token.into(), secret);
    }

    /// Look up the secret for a start token
    ///
    /// Absence means "no code available" for the refresh loop, not an
    /// error worth surfacing.
    pub fn get(&self, start_token: &str) -> Option<SecretString> {
        self.guard().get(start_token).cloned()
    }

    /// Delete every stored secret
    pub fn clear(&self) {
        self.guard().clear();
    }

    /// True when no secret is registered
    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    // A poisoned lock only means another thread panicked mid-operation;
    // the map itself is still structurally sound, so recover the guard.
    fn guard(&self) -> MutexGuard<'_, HashMap<String, SecretString>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_then_get() {
        let store = SessionSecretStore::new();
        store.put("t1", SecretString::from("s1"));

        let secret = store.get("t1").unwrap();
        assert_eq!(secret.expose(), "s1");
    }

    #[test]
    fn test_get_absent_token() {
        let store = SessionSecretStore::new();
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_clear_deletes_all_secrets() {
        let store = SessionSecretStore::new();
        store.put("t1", SecretString::from("s1"));
        store.put("t2", SecretString::from("s2"));

        store.clear();

        assert!(store.get("t1").is_none());
        assert!(store.get("t2").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_put_replaces_existing_token() {
        let store = SessionSecretStore::new();
        store.put("t1", SecretString::from("old"));
        store.put("t1", SecretString::from("new"));

        assert_eq!(store.get("t1").unwrap().expose(), "new");
    }

    #[test]
    fn test_empty_on_creation() {
        assert!(SessionSecretStore::new().is_empty());
    }
}
