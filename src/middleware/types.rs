use serde::{Deserialize, Serialize};

use crate::types::{CsrfToken, User};

/// `POST /login` body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// `POST /login` success body.
///
/// The CSRF token travels here, never in a cookie: client script must be
/// able to read it to echo it in `X-CSRF-Token`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub csrf_token: CsrfToken,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenResponse {
    pub csrf_token: CsrfToken,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `GET /check` body. `user` is omitted when not authenticated.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user_id: u64,
    pub username: String,
    pub email: String,
}

/// `POST /transfer` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub amount: f64,
    pub to_account: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferResponse {
    pub message: String,
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub timestamp: String,
}
