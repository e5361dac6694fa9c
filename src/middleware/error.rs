use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Authentication and CSRF errors for the middleware layer.
///
/// Client-facing messages are fixed per variant and never say which check
/// failed (unknown user, wrong password, missing token, replayed token).
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing, invalid or expired credential, or a failed login.
    #[error("Authentication failed")]
    Unauthenticated,

    /// Missing, mismatched or replayed CSRF token.
    #[error("Invalid CSRF token")]
    CsrfRejected,

    /// User verification failed for reasons other than bad credentials.
    #[error("User store error: {0}")]
    Store(String),

    /// Credential could not be issued.
    #[error("Credential error: {0}")]
    Credential(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::CsrfRejected => StatusCode::FORBIDDEN,
            Self::Store(_) | Self::Credential(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Unauthenticated | Self::CsrfRejected => self.to_string(),
            Self::Store(_) | Self::Credential(_) | Self::Config(_) => {
                tracing::error!(error = %self, "Auth internal error");
                "Internal error".to_string()
            }
        };
        (
            status,
            Json(json!({ "statusCode": status.as_u16(), "message": message })),
        )
            .into_response()
    }
}

impl From<crate::error::Error> for AuthError {
    fn from(e: crate::error::Error) -> Self {
        Self::Credential(e.to_string())
    }
}
