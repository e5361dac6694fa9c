use std::collections::HashMap;
use std::future::Future;

use crate::csrf::constant_time_eq;
use crate::types::User;

/// Boxed error returned by consumer-provided collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer-provided credential check.
///
/// Called by the login route after the anonymous CSRF token has been
/// consumed. Return `Ok(None)` for unknown users and wrong passwords alike;
/// the route answers both with the same `401`.
///
/// # Example
///
/// ```rust,ignore
/// impl UserVerifier for MyAppState {
///     async fn verify(&self, username: &str, password: &str) -> Result<Option<User>, BoxError> {
///         let Some(row) = self.repo.find_by_username(username).await? else {
///             return Ok(None);
///         };
///         Ok(row.check_password(password).then(|| User::new(row.id, row.username)))
///     }
/// }
/// ```
pub trait UserVerifier: Send + Sync + 'static {
    /// Verify a username/password pair.
    fn verify(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<Option<User>, BoxError>> + Send;
}

/// Fixed in-memory user table.
#[derive(Debug, Clone, Default)]
pub struct StaticUsers {
    users: HashMap<String, (u64, String)>,
}

impl StaticUsers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The single demo account: `user` / `password`, id 1.
    #[must_use]
    pub fn demo() -> Self {
        Self::new().with_user(1, "user", "password")
    }

    #[must_use]
    pub fn with_user(
        mut self,
        user_id: u64,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.users
            .insert(username.into(), (user_id, password.into()));
        self
    }
}

impl UserVerifier for StaticUsers {
    async fn verify(&self, username: &str, password: &str) -> Result<Option<User>, BoxError> {
        Ok(self
            .users
            .get(username)
            .filter(|(_, expected)| constant_time_eq(expected, password))
            .map(|(user_id, _)| User::new(*user_id, username)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_user_accepted() {
        let user = StaticUsers::demo().verify("user", "password").await.unwrap();
        assert_eq!(user, Some(User::new(1, "user")));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_alike() {
        let users = StaticUsers::demo();
        assert_eq!(users.verify("user", "wrong").await.unwrap(), None);
        assert_eq!(users.verify("nobody", "password").await.unwrap(), None);
    }

    #[tokio::test]
    async fn additional_users() {
        let users = StaticUsers::demo().with_user(2, "alice", "s3cret");
        let alice = users.verify("alice", "s3cret").await.unwrap().unwrap();
        assert_eq!(alice.user_id, 2);
    }
}
