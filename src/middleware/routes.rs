use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::CookieJar;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::config::CsrfAuthConfig;
use super::cookies;
use super::error::AuthError;
use super::extractor::{Authenticated, CsrfProtected, csrf_header, resolve_session};
use super::state::AuthState;
use super::traits::UserVerifier;
use super::types::{
    CheckResponse, CsrfTokenResponse, LoginRequest, LoginResponse, MessageResponse,
    ProfileResponse, TransferRequest, TransferResponse,
};
use crate::service::CsrfService;
use crate::store::TokenStore;
use crate::types::SessionId;

/// Create the CSRF-protected session router.
///
/// Tokens are kept in `token_store`; credentials are checked by `user_verifier`.
pub fn csrf_routes<U, S>(config: CsrfAuthConfig, user_verifier: U, token_store: S) -> Router
where
    U: UserVerifier,
    S: TokenStore,
{
    let auth_path = config.settings.auth_path.clone();

    let csrf = CsrfService::new(token_store)
        .with_anonymous_ttl(config.settings.anonymous_ttl)
        .with_session_ttl(config.issuer.ttl());

    let state = AuthState {
        csrf: Arc::new(csrf),
        issuer: Arc::new(config.issuer),
        user_verifier: Arc::new(user_verifier),
        settings: config.settings,
    };

    Router::new()
        .route(
            &format!("{auth_path}/anonymous-csrf-token"),
            get(anonymous_csrf_token::<U, S>),
        )
        .route(&format!("{auth_path}/login"), post(login::<U, S>))
        .route(&format!("{auth_path}/logout"), post(logout::<U, S>))
        .route(&format!("{auth_path}/csrf-token"), get(csrf_token::<U, S>))
        .route(&format!("{auth_path}/check"), get(check::<U, S>))
        .route(&format!("{auth_path}/profile"), get(profile))
        .route(&format!("{auth_path}/transfer"), post(transfer))
        .with_state(state)
}

// ── Anonymous token ────────────────────────────────────────────────

async fn anonymous_csrf_token<U: UserVerifier, S: TokenStore>(
    State(state): State<AuthState<U, S>>,
    jar: CookieJar,
) -> (CookieJar, Json<CsrfTokenResponse>) {
    let session_id = cookies::get_anonymous_session(&jar)
        .unwrap_or_else(|| state.csrf.issue_anonymous_session());

    // Re-sent on reuse too: the cookie must live as long as the new token.
    let jar = jar.add(cookies::anonymous_cookie(
        &session_id,
        state.settings.anonymous_ttl,
        state.settings.secure_cookies,
    ));

    let csrf_token = state.csrf.generate_anonymous_token(&session_id);

    tracing::info!("Anonymous CSRF token issued");

    (jar, Json(CsrfTokenResponse { csrf_token }))
}

// ── Login ──────────────────────────────────────────────────────────

async fn login<U: UserVerifier, S: TokenStore>(
    State(state): State<AuthState<U, S>>,
    jar: CookieJar,
    headers: HeaderMap,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginResponse>), AuthError> {
    let presented = csrf_header(&headers).ok_or_else(|| {
        tracing::warn!("Login without CSRF token");
        AuthError::Unauthenticated
    })?;

    let anonymous = cookies::get_anonymous_session(&jar).ok_or_else(|| {
        tracing::warn!("Login without anonymous session");
        AuthError::Unauthenticated
    })?;

    // Consumed before the password check: a failed login needs a fresh token.
    if !state.csrf.validate_and_consume_token(&anonymous, presented) {
        tracing::warn!("Login CSRF token rejected");
        return Err(AuthError::Unauthenticated);
    }

    let Json(body) = body.map_err(|e| {
        tracing::warn!(error = %e, "Login with malformed body");
        AuthError::Unauthenticated
    })?;

    let user = state
        .user_verifier
        .verify(&body.username, &body.password)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?
        .ok_or_else(|| {
            tracing::warn!("Login with invalid credentials");
            AuthError::Unauthenticated
        })?;

    let credential = state.issuer.issue(&user)?;
    let session_id = SessionId::derive(&credential);
    let csrf_token = state.csrf.generate_token(&session_id);

    let secure = state.settings.secure_cookies;
    let jar = jar
        .add(cookies::auth_cookie(
            &state.settings.auth_cookie_name,
            &credential,
            state.issuer.ttl(),
            secure,
        ))
        .add(cookies::clear_anonymous_cookie(secure));

    tracing::info!(user_id = user.user_id, secure_cookies = secure, "Login successful");

    Ok((
        jar,
        Json(LoginResponse {
            message: "Login successful".into(),
            csrf_token,
            user,
        }),
    ))
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<U: UserVerifier, S: TokenStore>(
    State(state): State<AuthState<U, S>>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let cookie_name = &state.settings.auth_cookie_name;

    if let Some(credential) = cookies::get_credential(&jar, cookie_name) {
        state.csrf.clear_token(&SessionId::derive(&credential));
    }

    let jar = jar.add(cookies::clear_auth_cookie(
        cookie_name,
        state.settings.secure_cookies,
    ));

    (
        jar,
        Json(MessageResponse {
            message: "Logout successful".into(),
        }),
    )
}

// ── Token refresh ──────────────────────────────────────────────────

/// Replaces the session's token. Other tabs holding the old one must re-fetch.
async fn csrf_token<U: UserVerifier, S: TokenStore>(
    State(state): State<AuthState<U, S>>,
    session: Authenticated,
) -> Json<CsrfTokenResponse> {
    let csrf_token = state.csrf.generate_token(&session.session_id);
    tracing::debug!(user_id = session.user.user_id, "CSRF token refreshed");
    Json(CsrfTokenResponse { csrf_token })
}

// ── Status ─────────────────────────────────────────────────────────

async fn check<U: UserVerifier, S: TokenStore>(
    State(state): State<AuthState<U, S>>,
    jar: CookieJar,
) -> Json<CheckResponse> {
    let user = resolve_session(&state, &jar).map(|session| session.user);
    Json(CheckResponse {
        authenticated: user.is_some(),
        user,
    })
}

// ── Protected ──────────────────────────────────────────────────────

async fn profile(CsrfProtected(session): CsrfProtected) -> Json<ProfileResponse> {
    let user = session.user;
    Json(ProfileResponse {
        email: format!("{}@example.com", user.username),
        user_id: user.user_id,
        username: user.username,
    })
}

async fn transfer(
    CsrfProtected(session): CsrfProtected,
    Json(body): Json<TransferRequest>,
) -> Json<TransferResponse> {
    tracing::info!(
        user_id = session.user.user_id,
        to = %body.to_account,
        amount = body.amount,
        "Transfer passed CSRF check"
    );

    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    Json(TransferResponse {
        message: "Transfer successful".into(),
        from: session.user.username,
        to: body.to_account,
        amount: body.amount,
        timestamp,
    })
}
