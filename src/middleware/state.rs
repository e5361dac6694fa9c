use std::sync::Arc;

use super::config::AuthSettings;
use crate::credential::CredentialIssuer;
use crate::service::CsrfService;

/// Shared state for auth route handlers and extractors.
pub struct AuthState<U, S> {
    pub(super) csrf: Arc<CsrfService<S>>,
    pub(super) issuer: Arc<CredentialIssuer>,
    pub(super) user_verifier: Arc<U>,
    pub(super) settings: AuthSettings,
}

// Manual Clone: avoid derive adding `U: Clone, S: Clone` bounds.
impl<U, S> Clone for AuthState<U, S> {
    fn clone(&self) -> Self {
        Self {
            csrf: self.csrf.clone(),
            issuer: self.issuer.clone(),
            user_verifier: self.user_verifier.clone(),
            settings: self.settings.clone(),
        }
    }
}
