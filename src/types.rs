use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::csrf;

/// Session identifier derived from an authentication credential.
///
/// Deterministic for a given credential: the same cookie value always maps
/// to the same key. Only used to look up the session's CSRF token.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Derive the session identifier for a credential.
    #[must_use]
    pub fn derive(credential: &str) -> Self {
        Self(csrf::derive_session_key(credential))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Random identifier for a client that has not logged in yet.
///
/// Lets the login request itself carry CSRF protection before any
/// [`SessionId`] exists.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct AnonymousSessionId(pub String);

impl AnonymousSessionId {
    /// Generate a fresh anonymous session identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(csrf::generate_anonymous_id())
    }

    /// Parse an identifier received from a client cookie.
    ///
    /// Returns `None` unless the value has the shape produced by
    /// [`generate`](Self::generate).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        csrf::is_anonymous_id(value).then(|| Self(value.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Anti-CSRF token handed to client script and echoed in `X-CSRF-Token`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct CsrfToken(pub String);

impl CsrfToken {
    /// Generate a fresh random token.
    #[must_use]
    pub fn generate() -> Self {
        Self(csrf::generate_token())
    }

    /// Constant-time comparison against a token presented by a client.
    #[must_use]
    pub fn matches(&self, presented: &str) -> bool {
        csrf::constant_time_eq(&self.0, presented)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CsrfToken(..)")
    }
}

/// Authenticated user carried inside the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: u64,
    pub username: String,
}

impl User {
    #[must_use]
    pub fn new(user_id: u64, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}
