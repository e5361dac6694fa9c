use std::time::Duration;

use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::version4::V4;
use pasetors::{Local, local};
use rand::Rng;
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};

use crate::error::Error;
use crate::types::User;

/// Default credential lifetime, also the `auth_token` cookie max-age.
pub const DEFAULT_CREDENTIAL_TTL: Duration = Duration::from_secs(3 * 24 * 60 * 60);

const DEFAULT_ISSUER: &str = "csrf-session";

/// Issues and verifies the `auth_token` credential.
///
/// Credentials are PASETO `v4.local` tokens: encrypted and authenticated
/// with a symmetric key only the server holds, so a client can neither read
/// nor forge the claims.
pub struct CredentialIssuer {
    key: SymmetricKey<V4>,
    issuer: String,
    ttl: Duration,
}

impl CredentialIssuer {
    /// Build an issuer whose key is derived from `secret`.
    ///
    /// `key = SHA256(secret)`, so any non-empty secret of any length works
    /// and the same secret always yields the same key across restarts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Key`] if the secret is empty.
    pub fn from_secret(secret: &[u8]) -> Result<Self, Error> {
        if secret.is_empty() {
            return Err(Error::Key("secret must not be empty".into()));
        }
        Self::from_key_bytes(&Sha256::digest(secret))
    }

    /// Build an issuer with a random key.
    ///
    /// Credentials issued by it do not survive a restart.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Key`] if the key cannot be constructed.
    pub fn generate() -> Result<Self, Error> {
        let bytes: [u8; 32] = rand::rng().random();
        Self::from_key_bytes(&bytes)
    }

    fn from_key_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let key = SymmetricKey::<V4>::from(bytes).map_err(|e| Error::Key(e.to_string()))?;
        Ok(Self {
            key,
            issuer: DEFAULT_ISSUER.into(),
            ttl: DEFAULT_CREDENTIAL_TTL,
        })
    }

    /// Override the `iss`/`aud` value (default: `"csrf-session"`).
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a credential for `user`.
    ///
    /// Every call yields a distinct token, so every login gets its own
    /// session identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Credential`] if claims cannot be built or encryption fails.
    pub fn issue(&self, user: &User) -> Result<String, Error> {
        let mut claims = Claims::new_expires_in(&self.ttl).map_err(credential_error)?;
        claims.issuer(&self.issuer).map_err(credential_error)?;
        claims.audience(&self.issuer).map_err(credential_error)?;
        claims
            .subject(&user.user_id.to_string())
            .map_err(credential_error)?;
        claims
            .add_additional("username", user.username.clone())
            .map_err(credential_error)?;

        local::encrypt(&self.key, &claims, None, None).map_err(credential_error)
    }

    /// Verify a credential and return the user it was issued for.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Credential`] if the token format is invalid, it was not
    /// encrypted with this issuer's key, it is expired or not yet valid, or the
    /// `iss`/`aud`/`sub`/`username` claims are missing or do not match.
    pub fn verify(&self, token_str: &str) -> Result<User, Error> {
        if !token_str.starts_with("v4.local.") {
            return Err(Error::Credential("invalid token format".into()));
        }

        // ClaimsValidationRules validates exp, nbf, iat by default
        let validation_rules = ClaimsValidationRules::new();

        let untrusted_token =
            UntrustedToken::<Local, V4>::try_from(token_str).map_err(credential_error)?;

        let trusted_token =
            local::decrypt(&self.key, &untrusted_token, &validation_rules, None, None)
                .map_err(credential_error)?;

        let payload = trusted_token
            .payload_claims()
            .ok_or_else(|| Error::Credential("missing payload".into()))?;
        let payload_str = payload.to_string().map_err(credential_error)?;
        let json_value: JsonValue = serde_json::from_str(&payload_str)
            .map_err(|e| Error::Credential(e.to_string()))?;

        for claim in ["iss", "aud"] {
            let actual = json_value
                .get(claim)
                .and_then(|v| v.as_str())
                .ok_or_else(|| Error::Credential(format!("missing claim: {claim}")))?;
            if actual != self.issuer {
                return Err(Error::Credential(format!(
                    "{claim}: expected '{}', got '{actual}'",
                    self.issuer
                )));
            }
        }

        let user_id = json_value
            .get("sub")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| Error::Credential("missing or invalid claim: sub".into()))?;
        let username = json_value
            .get("username")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Credential("missing claim: username".into()))?;

        Ok(User::new(user_id, username))
    }
}

fn credential_error(e: pasetors::errors::Error) -> Error {
    Error::Credential(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> CredentialIssuer {
        CredentialIssuer::from_secret(b"unit-test-secret").unwrap()
    }

    #[test]
    fn test_issue_then_verify() {
        let issuer = issuer();
        let user = User::new(1, "user");
        let credential = issuer.issue(&user).unwrap();

        assert!(credential.starts_with("v4.local."));
        assert_eq!(issuer.verify(&credential).unwrap(), user);
    }

    #[test]
    fn test_each_credential_is_distinct() {
        let issuer = issuer();
        let user = User::new(1, "user");
        assert_ne!(issuer.issue(&user).unwrap(), issuer.issue(&user).unwrap());
    }

    #[test]
    fn test_same_secret_verifies_across_instances() {
        let credential = issuer().issue(&User::new(7, "seven")).unwrap();
        assert_eq!(issuer().verify(&credential).unwrap().user_id, 7);
    }

    #[test]
    fn test_foreign_key_rejected() {
        let credential = CredentialIssuer::generate()
            .unwrap()
            .issue(&User::new(1, "user"))
            .unwrap();
        assert!(issuer().verify(&credential).is_err());
    }

    #[test]
    fn test_issuer_mismatch_rejected() {
        let credential = issuer()
            .with_issuer("someone-else")
            .issue(&User::new(1, "user"))
            .unwrap();
        let err = issuer().verify(&credential).unwrap_err();
        assert!(err.to_string().contains("iss"));
    }

    #[test]
    fn test_garbage_rejected() {
        let issuer = issuer();
        assert!(issuer.verify("").is_err());
        assert!(issuer.verify("not-a-token").is_err());
        assert!(issuer.verify("v4.local.AAAA").is_err());
        assert!(issuer.verify("v4.public.AAAA").is_err());
    }

    #[test]
    fn test_tampered_credential_rejected() {
        let issuer = issuer();
        let credential = issuer.issue(&User::new(1, "user")).unwrap();
        // flip a character inside the body, past the "v4.local." header
        let mut chars: Vec<char> = credential.chars().collect();
        chars[20] = if chars[20] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();
        assert!(issuer.verify(&tampered).is_err());
    }

    #[test]
    fn test_ttl_override() {
        let issuer = issuer().with_ttl(Duration::from_secs(60));
        assert_eq!(issuer.ttl(), Duration::from_secs(60));
        let credential = issuer.issue(&User::new(1, "user")).unwrap();
        assert!(issuer.verify(&credential).is_ok());
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(CredentialIssuer::from_secret(b"").is_err());
    }
}
