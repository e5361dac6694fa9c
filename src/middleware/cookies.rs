use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::types::AnonymousSessionId;

pub(super) const ANONYMOUS_COOKIE_NAME: &str = "anonymous_session_id";

/// Create the anonymous session cookie.
pub(super) fn anonymous_cookie(
    session_id: &AnonymousSessionId,
    ttl: std::time::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((ANONYMOUS_COOKIE_NAME, session_id.as_str().to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(to_time(ttl))
        .build()
}

/// Create the removal cookie for the anonymous session.
pub(super) fn clear_anonymous_cookie(secure: bool) -> Cookie<'static> {
    removal(ANONYMOUS_COOKIE_NAME.to_string(), secure)
}

/// Create the credential cookie.
pub(super) fn auth_cookie(
    name: &str,
    credential: &str,
    ttl: std::time::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), credential.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(to_time(ttl))
        .build()
}

/// Create the removal cookie for the credential.
pub(super) fn clear_auth_cookie(name: &str, secure: bool) -> Cookie<'static> {
    removal(name.to_string(), secure)
}

/// Get the anonymous session id from cookies, if present and well-formed.
pub(super) fn get_anonymous_session(jar: &CookieJar) -> Option<AnonymousSessionId> {
    jar.get(ANONYMOUS_COOKIE_NAME)
        .and_then(|c| AnonymousSessionId::parse(c.value()))
}

/// Get the raw credential from cookies.
pub(super) fn get_credential(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

fn removal(name: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

fn to_time(ttl: std::time::Duration) -> Duration {
    Duration::try_from(ttl).unwrap_or(Duration::MAX)
}
