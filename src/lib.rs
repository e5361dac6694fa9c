#![doc = include_str!("../README.md")]

pub mod credential;
pub mod csrf;
pub mod error;
#[cfg(feature = "middleware")]
pub mod middleware;
pub mod service;
pub mod store;
pub mod types;

// Re-exports for convenient access
pub use credential::CredentialIssuer;
pub use error::Error;
pub use service::CsrfService;
pub use store::{MemoryTokenStore, StoredToken, TokenStore};
pub use types::{AnonymousSessionId, CsrfToken, SessionId, User};
