use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use super::cookies;
use super::error::AuthError;
use super::state::AuthState;
use super::traits::UserVerifier;
use crate::store::TokenStore;
use crate::types::{SessionId, User};

/// Request header carrying the CSRF token.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Authenticated session extracted from the credential cookie.
///
/// Use as an Axum extractor in route handlers. Returns `401 Unauthorized`
/// if the cookie is missing or the credential does not verify. Does not
/// check the CSRF header; see [`CsrfProtected`] for that.
///
/// # Example
///
/// ```rust,ignore
/// async fn whoami(session: Authenticated) -> impl IntoResponse {
///     format!("Hello, {}", session.user.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// Lookup key derived from the credential cookie.
    pub session_id: SessionId,
    /// User the credential was issued for.
    pub user: User,
}

impl<U: UserVerifier, S: TokenStore> FromRequestParts<AuthState<U, S>> for Authenticated {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthState<U, S>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        resolve_session(state, &jar).ok_or(AuthError::Unauthenticated)
    }
}

/// Authenticated session whose request also carried the matching CSRF token.
///
/// Returns `401 Unauthorized` when the credential check fails and
/// `403 Forbidden` when the `X-CSRF-Token` header is missing or does not
/// match the token stored for the session. The credential is checked first.
///
/// # Example
///
/// ```rust,ignore
/// async fn transfer(CsrfProtected(session): CsrfProtected) -> impl IntoResponse {
///     format!("Transfer by {}", session.user.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CsrfProtected(pub Authenticated);

impl<U: UserVerifier, S: TokenStore> FromRequestParts<AuthState<U, S>> for CsrfProtected {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthState<U, S>,
    ) -> Result<Self, Self::Rejection> {
        let session = Authenticated::from_request_parts(parts, state).await?;

        let Some(presented) = csrf_header(&parts.headers) else {
            tracing::warn!(user_id = session.user.user_id, "CSRF token missing");
            return Err(AuthError::CsrfRejected);
        };

        if !state.csrf.validate_token(&session.session_id, presented) {
            tracing::warn!(user_id = session.user.user_id, "CSRF token mismatch");
            return Err(AuthError::CsrfRejected);
        }

        Ok(Self(session))
    }
}

/// Resolve the session from the credential cookie, if any.
///
/// Unlike the [`Authenticated`] extractor this never rejects; routes that
/// serve both anonymous and logged-in clients branch on the result.
pub fn resolve_session<U: UserVerifier, S: TokenStore>(
    state: &AuthState<U, S>,
    jar: &CookieJar,
) -> Option<Authenticated> {
    let credential = cookies::get_credential(jar, &state.settings.auth_cookie_name)?;

    match state.issuer.verify(&credential) {
        Ok(user) => Some(Authenticated {
            session_id: SessionId::derive(&credential),
            user,
        }),
        Err(e) => {
            tracing::debug!(error = %e, "Credential rejected");
            None
        }
    }
}

/// Get the CSRF token header value, if present and non-empty.
pub(super) fn csrf_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderName, HeaderValue};

    use super::*;

    #[test]
    fn csrf_header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        let name: HeaderName = "X-CSRF-Token".parse().unwrap();
        headers.insert(name, HeaderValue::from_static("abc"));
        assert_eq!(csrf_header(&headers), Some("abc"));
    }

    #[test]
    fn empty_csrf_header_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(CSRF_HEADER, HeaderValue::from_static(""));
        assert_eq!(csrf_header(&headers), None);
        assert_eq!(csrf_header(&HeaderMap::new()), None);
    }
}
