//! Plug-and-play CSRF-protected session routes for Axum.
//!
//! Implements the header-token pattern: the credential lives in an
//! `HttpOnly` cookie that script cannot read, and every state-changing
//! request must also echo a session-bound token in `X-CSRF-Token`, which a
//! cross-origin page cannot obtain.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use csrf_session::MemoryTokenStore;
//! use csrf_session::middleware::{CsrfAuthConfig, StaticUsers, csrf_routes};
//!
//! // 1. Configure from environment
//! let config = CsrfAuthConfig::from_env()?;
//!
//! // 2. Mount the routes with a user verifier and a token store
//! let app = axum::Router::new()
//!     .merge(csrf_routes(config, StaticUsers::demo(), MemoryTokenStore::new()));
//! ```
//!
//! # Routes
//!
//! | Route | Requires | Returns |
//! |---|---|---|
//! | `GET /anonymous-csrf-token` | nothing | `{csrfToken}`, sets `anonymous_session_id` |
//! | `POST /login` | anonymous cookie + `X-CSRF-Token` | `{message, csrfToken, user}`, sets `auth_token` |
//! | `POST /logout` | nothing | `{message}`, clears `auth_token` |
//! | `GET /csrf-token` | `auth_token` | `{csrfToken}` |
//! | `GET /check` | nothing | `{authenticated, user?}` |
//! | `GET /profile`, `POST /transfer` | `auth_token` + `X-CSRF-Token` | demo payloads |

mod config;
mod cookies;
mod error;
mod extractor;
mod routes;
mod state;
mod traits;
mod types;

pub use config::CsrfAuthConfig;
pub use error::AuthError;
pub use extractor::{Authenticated, CSRF_HEADER, CsrfProtected, resolve_session};
pub use routes::csrf_routes;
pub use state::AuthState;
pub use traits::{BoxError, StaticUsers, UserVerifier};
pub use types::{
    CheckResponse, CsrfTokenResponse, LoginRequest, LoginResponse, MessageResponse,
    ProfileResponse, TransferRequest, TransferResponse,
};
