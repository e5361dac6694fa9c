//! Session-bound anti-CSRF token protocol.
//!
//! A [`CsrfService`] hands out one token per session key and answers whether
//! a token presented by a client belongs to that session. Two kinds of
//! session key exist:
//!
//! - [`AnonymousSessionId`]: issued before login. Its token is single-use and
//!   is consumed by the login request.
//! - [`SessionId`]: derived from the credential cookie after login. Its token
//!   stays valid until refreshed, cleared, or expired.
//!
//! Refreshing overwrites the stored token, so any other open tab still
//! holding the previous token gets a CSRF rejection and has to fetch again.

use std::time::{Duration, Instant};

use crate::store::{StoredToken, TokenStore};
use crate::types::{AnonymousSessionId, CsrfToken, SessionId};

/// Lifetime of an anonymous session and its token (matches the cookie max-age).
pub const DEFAULT_ANONYMOUS_TTL: Duration = Duration::from_secs(10 * 60);

/// Lifetime of an authenticated session's token (matches the credential).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3 * 24 * 60 * 60);

/// Longest lifetime any token can be given. Longer TTLs are clamped.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Issues and validates CSRF tokens against an injected [`TokenStore`].
pub struct CsrfService<S> {
    store: S,
    anonymous_ttl: Duration,
    session_ttl: Duration,
}

impl<S: TokenStore> CsrfService<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            anonymous_ttl: DEFAULT_ANONYMOUS_TTL,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }

    #[must_use]
    pub fn with_anonymous_ttl(mut self, ttl: Duration) -> Self {
        self.anonymous_ttl = ttl.min(MAX_TOKEN_TTL);
        self
    }

    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl.min(MAX_TOKEN_TTL);
        self
    }

    /// Issue a fresh anonymous session identifier.
    ///
    /// Nothing is stored until a token is generated for it.
    #[must_use]
    pub fn issue_anonymous_session(&self) -> AnonymousSessionId {
        AnonymousSessionId::generate()
    }

    /// Derive the session identifier for a credential.
    #[must_use]
    pub fn derive_session_id(credential: &str) -> SessionId {
        SessionId::derive(credential)
    }

    /// Generate a multi-use token for an authenticated session, replacing any previous one.
    pub fn generate_token(&self, session_id: &SessionId) -> CsrfToken {
        self.put_fresh(session_id.as_str(), self.session_ttl)
    }

    /// Generate a single-use token for an anonymous session, replacing any previous one.
    pub fn generate_anonymous_token(&self, session_id: &AnonymousSessionId) -> CsrfToken {
        self.put_fresh(session_id.as_str(), self.anonymous_ttl)
    }

    /// Whether `presented` is the live token for `session_id`. The token stays usable.
    #[must_use]
    pub fn validate_token(&self, session_id: &SessionId, presented: &str) -> bool {
        let now = Instant::now();
        self.store
            .get(session_id.as_str())
            .is_some_and(|stored| stored.is_live(now) && stored.token.matches(presented))
    }

    /// Validate an anonymous token and delete it on success.
    ///
    /// Of several concurrent calls with the same token at most one returns `true`.
    #[must_use]
    pub fn validate_and_consume_token(
        &self,
        session_id: &AnonymousSessionId,
        presented: &str,
    ) -> bool {
        let now = Instant::now();
        self.store
            .take_if(session_id.as_str(), &|stored| {
                stored.is_live(now) && stored.token.matches(presented)
            })
            .is_some()
    }

    /// Delete the token for `session_id`, if any.
    pub fn clear_token(&self, session_id: &SessionId) {
        if self.store.remove(session_id.as_str()) {
            tracing::debug!("CSRF token cleared");
        }
    }

    /// Drop expired tokens. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired(Instant::now())
    }

    fn put_fresh(&self, session_key: &str, ttl: Duration) -> CsrfToken {
        let token = CsrfToken::generate();
        let now = Instant::now();
        // An unrepresentable expiry stores the token already expired.
        let expires_at = now.checked_add(ttl).unwrap_or(now);
        self.store
            .put(session_key, StoredToken::new(token.clone(), expires_at));
        token
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::store::MemoryTokenStore;

    fn service() -> CsrfService<MemoryTokenStore> {
        CsrfService::new(MemoryTokenStore::new())
    }

    #[test]
    fn test_generated_token_validates() {
        let service = service();
        let session = SessionId::derive("credential");
        let token = service.generate_token(&session);

        assert!(service.validate_token(&session, token.as_str()));
        assert!(!service.validate_token(&session, "something-else"));
        assert!(!service.validate_token(&session, ""));
    }

    #[test]
    fn test_token_is_multi_use() {
        let service = service();
        let session = SessionId::derive("credential");
        let token = service.generate_token(&session);

        for _ in 0..3 {
            assert!(service.validate_token(&session, token.as_str()));
        }
    }

    #[test]
    fn test_token_bound_to_its_session() {
        let service = service();
        let alice = SessionId::derive("alice-credential");
        let mallory = SessionId::derive("mallory-credential");
        let alice_token = service.generate_token(&alice);
        service.generate_token(&mallory);

        assert!(!service.validate_token(&mallory, alice_token.as_str()));
    }

    #[test]
    fn test_refresh_invalidates_previous_token() {
        let store = MemoryTokenStore::new();
        let service = CsrfService::new(store.clone());
        let session = SessionId::derive("credential");
        let old = service.generate_token(&session);
        let new = service.generate_token(&session);

        assert!(!service.validate_token(&session, old.as_str()));
        assert!(service.validate_token(&session, new.as_str()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clear_token() {
        let store = MemoryTokenStore::new();
        let service = CsrfService::new(store.clone());
        let session = SessionId::derive("credential");
        let token = service.generate_token(&session);

        service.clear_token(&session);

        assert!(!service.validate_token(&session, token.as_str()));
        assert!(!service.validate_token(&session, ""));
        assert!(store.is_empty());
    }

    #[test]
    fn test_unknown_session_never_validates() {
        let service = service();
        assert!(!service.validate_token(&SessionId::derive("nobody"), ""));
    }

    #[test]
    fn test_anonymous_token_single_use() {
        let service = service();
        let anonymous = service.issue_anonymous_session();
        let token = service.generate_anonymous_token(&anonymous);

        assert!(service.validate_and_consume_token(&anonymous, token.as_str()));
        assert!(!service.validate_and_consume_token(&anonymous, token.as_str()));
    }

    #[test]
    fn test_failed_consume_keeps_token() {
        let service = service();
        let anonymous = service.issue_anonymous_session();
        let token = service.generate_anonymous_token(&anonymous);

        assert!(!service.validate_and_consume_token(&anonymous, "wrong"));
        assert!(service.validate_and_consume_token(&anonymous, token.as_str()));
    }

    #[test]
    fn test_anonymous_token_wrong_session() {
        let service = service();
        let first = service.issue_anonymous_session();
        let second = service.issue_anonymous_session();
        let token = service.generate_anonymous_token(&first);

        assert!(!service.validate_and_consume_token(&second, token.as_str()));
    }

    #[test]
    fn test_expired_tokens_rejected() {
        let store = MemoryTokenStore::new();
        let service = CsrfService::new(store.clone())
            .with_anonymous_ttl(Duration::ZERO)
            .with_session_ttl(Duration::ZERO);
        let session = SessionId::derive("credential");
        let anonymous = service.issue_anonymous_session();
        let token = service.generate_token(&session);
        let anonymous_token = service.generate_anonymous_token(&anonymous);

        assert!(!service.validate_token(&session, token.as_str()));
        assert!(!service.validate_and_consume_token(&anonymous, anonymous_token.as_str()));
        assert_eq!(service.purge_expired(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_oversized_ttl_is_clamped() {
        let service = CsrfService::new(MemoryTokenStore::new())
            .with_anonymous_ttl(Duration::MAX)
            .with_session_ttl(Duration::MAX);
        let session = SessionId::derive("credential");
        let anonymous = service.issue_anonymous_session();

        let token = service.generate_token(&session);
        let anonymous_token = service.generate_anonymous_token(&anonymous);

        assert!(service.validate_token(&session, token.as_str()));
        assert!(service.validate_and_consume_token(&anonymous, anonymous_token.as_str()));
        assert_eq!(service.purge_expired(), 0);
    }

    #[test]
    fn test_derive_session_id_deterministic() {
        let a = CsrfService::<MemoryTokenStore>::derive_session_id("credential");
        let b = CsrfService::<MemoryTokenStore>::derive_session_id("credential");
        assert_eq!(a, b);
    }

    #[test]
    fn test_concurrent_consume_has_one_winner() {
        const CONTENDERS: usize = 8;

        for _ in 0..50 {
            let service = service();
            let anonymous = service.issue_anonymous_session();
            let token = service.generate_anonymous_token(&anonymous);
            let barrier = Barrier::new(CONTENDERS);
            let winners = AtomicUsize::new(0);

            std::thread::scope(|scope| {
                for _ in 0..CONTENDERS {
                    scope.spawn(|| {
                        barrier.wait();
                        if service.validate_and_consume_token(&anonymous, token.as_str()) {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    });
                }
            });

            assert_eq!(winners.load(Ordering::SeqCst), 1);
        }
    }
}
