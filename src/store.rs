use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;

use crate::types::CsrfToken;

/// A CSRF token as held by a [`TokenStore`].
#[derive(Debug, Clone)]
pub struct StoredToken {
    pub token: CsrfToken,
    pub expires_at: Instant,
}

impl StoredToken {
    #[must_use]
    pub fn new(token: CsrfToken, expires_at: Instant) -> Self {
        Self { token, expires_at }
    }

    /// Whether the token is still usable at `now`.
    #[must_use]
    pub fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Storage for one CSRF token per session key.
///
/// Implementations must make [`put`](Self::put) an atomic overwrite and
/// [`take_if`](Self::take_if) an atomic compare-and-delete: two callers
/// racing to take the same entry cannot both receive it.
pub trait TokenStore: Send + Sync + 'static {
    /// Store `token` under `session_key`, replacing any previous token.
    fn put(&self, session_key: &str, token: StoredToken);

    /// Look up the token for `session_key`.
    fn get(&self, session_key: &str) -> Option<StoredToken>;

    /// Remove and return the token for `session_key` if `predicate` accepts it.
    fn take_if(
        &self,
        session_key: &str,
        predicate: &dyn Fn(&StoredToken) -> bool,
    ) -> Option<StoredToken>;

    /// Remove the token for `session_key`. Returns whether one existed.
    fn remove(&self, session_key: &str) -> bool;

    /// Drop every entry that is no longer live at `now`. Returns how many were dropped.
    fn purge_expired(&self, now: Instant) -> usize;
}

/// In-process [`TokenStore`] backed by a sharded concurrent map.
///
/// Cloning is cheap and clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    tokens: Arc<DashMap<String, StoredToken>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tokens, live or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl TokenStore for MemoryTokenStore {
    fn put(&self, session_key: &str, token: StoredToken) {
        self.tokens.insert(session_key.to_owned(), token);
    }

    fn get(&self, session_key: &str) -> Option<StoredToken> {
        self.tokens.get(session_key).map(|entry| entry.value().clone())
    }

    fn take_if(
        &self,
        session_key: &str,
        predicate: &dyn Fn(&StoredToken) -> bool,
    ) -> Option<StoredToken> {
        // remove_if holds the shard write lock across the check and the removal
        self.tokens
            .remove_if(session_key, |_, stored| predicate(stored))
            .map(|(_, stored)| stored)
    }

    fn remove(&self, session_key: &str) -> bool {
        self.tokens.remove(session_key).is_some()
    }

    fn purge_expired(&self, now: Instant) -> usize {
        let before = self.tokens.len();
        self.tokens.retain(|_, stored| stored.is_live(now));
        before.saturating_sub(self.tokens.len())
    }
}
