use std::time::Duration;

use super::error::AuthError;
use crate::credential::CredentialIssuer;
use crate::service::{DEFAULT_ANONYMOUS_TTL, MAX_TOKEN_TTL};

/// Shared auth settings used by both config and runtime state.
#[derive(Debug, Clone)]
pub(crate) struct AuthSettings {
    pub(crate) auth_cookie_name: String,
    pub(crate) secure_cookies: bool,
    pub(crate) auth_path: String,
    pub(crate) anonymous_ttl: Duration,
}

impl AuthSettings {
    fn defaults() -> Self {
        Self {
            auth_cookie_name: "auth_token".into(),
            secure_cookies: false,
            auth_path: String::new(),
            anonymous_ttl: DEFAULT_ANONYMOUS_TTL,
        }
    }
}

/// CSRF-protected session configuration.
///
/// Required field (`issuer`) is a constructor parameter.
///
/// Use [`from_env()`](CsrfAuthConfig::from_env) for convention-based setup,
/// or [`new()`](CsrfAuthConfig::new) with `with_*` methods for full control.
///
/// Cookies are always `HttpOnly` and `SameSite=Lax`; neither is configurable.
/// `Secure` can be switched on but never back off.
pub struct CsrfAuthConfig {
    pub(super) issuer: CredentialIssuer,
    pub(super) settings: AuthSettings,
}

impl CsrfAuthConfig {
    /// Create config with the required credential issuer.
    ///
    /// The credential cookie lives as long as the issuer's TTL.
    #[must_use]
    pub fn new(issuer: CredentialIssuer) -> Self {
        Self {
            issuer,
            settings: AuthSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `SECRET_KEY`: secret the credential key is derived from. When unset an
    ///   ephemeral key is generated and every restart logs all users out.
    /// - `APP_ENV` or `NODE_ENV`: `"production"` turns on `Secure` cookies
    /// - `FORCE_SECURE_COOKIE`: `"1"` or `"true"` turns on `Secure` cookies
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if `SECRET_KEY` is set but empty or a key
    /// cannot be built.
    pub fn from_env() -> Result<Self, AuthError> {
        let issuer = match std::env::var("SECRET_KEY") {
            Ok(secret) => CredentialIssuer::from_secret(secret.as_bytes()).map_err(|e| {
                AuthError::Config(format!(
                    "SECRET_KEY is set but unusable ({e}). \
                     Remove the env var to use an ephemeral key, or provide a non-empty secret."
                ))
            })?,
            Err(_) => {
                tracing::warn!("SECRET_KEY not set, using an ephemeral credential key");
                CredentialIssuer::generate().map_err(|e| AuthError::Config(e.to_string()))?
            }
        };

        let config = Self::new(issuer);
        Ok(if wants_secure_cookies(|name| std::env::var(name).ok()) {
            config.require_secure_cookies()
        } else {
            config
        })
    }

    #[must_use]
    pub fn with_auth_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.auth_cookie_name = name.into();
        self
    }

    /// Mark every cookie `Secure`. There is no way to undo this.
    #[must_use]
    pub fn require_secure_cookies(mut self) -> Self {
        self.settings.secure_cookies = true;
        self
    }

    /// Prefix for all routes (default: none, so routes are `/login`, `/check`, ...).
    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    /// Lifetime of anonymous sessions, their cookie and their token (default: 10 minutes).
    #[must_use]
    pub fn with_anonymous_ttl(mut self, ttl: Duration) -> Self {
        self.settings.anonymous_ttl = ttl.min(MAX_TOKEN_TTL);
        self
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.settings.secure_cookies
    }
}

/// Whether the environment asks for `Secure` cookies.
fn wants_secure_cookies(var: impl Fn(&str) -> Option<String>) -> bool {
    let production = ["APP_ENV", "NODE_ENV"]
        .iter()
        .any(|&name| var(name).as_deref() == Some("production"));
    let forced = matches!(
        var("FORCE_SECURE_COOKIE").as_deref(),
        Some("1") | Some("true")
    );
    production || forced
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CsrfAuthConfig {
        CsrfAuthConfig::new(CredentialIssuer::from_secret(b"config-test").unwrap())
    }

    #[test]
    fn defaults() {
        let config = config();
        assert_eq!(config.settings.auth_cookie_name, "auth_token");
        assert_eq!(config.settings.auth_path, "");
        assert_eq!(config.settings.anonymous_ttl, Duration::from_secs(600));
        assert!(!config.secure_cookies());
    }

    #[test]
    fn secure_cookies_stay_on() {
        let config = config().require_secure_cookies().with_auth_path("/secure-auth");
        assert!(config.secure_cookies());
        assert_eq!(config.settings.auth_path, "/secure-auth");
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| {
            vars.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn secure_cookies_from_environment() {
        assert!(!wants_secure_cookies(env(&[])));
        assert!(!wants_secure_cookies(env(&[("APP_ENV", "development")])));
        assert!(wants_secure_cookies(env(&[("APP_ENV", "production")])));
        assert!(wants_secure_cookies(env(&[("NODE_ENV", "production")])));
        assert!(wants_secure_cookies(env(&[("FORCE_SECURE_COOKIE", "1")])));
        assert!(wants_secure_cookies(env(&[("FORCE_SECURE_COOKIE", "true")])));
        assert!(!wants_secure_cookies(env(&[("FORCE_SECURE_COOKIE", "yes")])));
    }

    #[test]
    fn anonymous_ttl_is_clamped() {
        let config = config().with_anonymous_ttl(Duration::MAX);
        assert_eq!(config.settings.anonymous_ttl, MAX_TOKEN_TTL);
    }
}
