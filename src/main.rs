use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method, header};
use csrf_session::middleware::{CSRF_HEADER, CsrfAuthConfig, StaticUsers, csrf_routes};
use csrf_session::{CsrfService, MemoryTokenStore};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:5174",
    "http://localhost:8080",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = CsrfAuthConfig::from_env()?;
    let secure_cookies = config.secure_cookies();
    let store = MemoryTokenStore::new();

    tokio::spawn(purge_expired_tokens(CsrfService::new(store.clone())));

    let app = csrf_routes(config, StaticUsers::demo(), store)
        .layer(cors_layer()?)
        .layer(TraceLayer::new_for_http());

    let port = match std::env::var("PORT") {
        Ok(port) => port.parse::<u16>()?,
        Err(_) => 3000,
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, secure_cookies, "CSRF session server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Credentialed CORS for the browser clients, allowing the CSRF header.
///
/// Origins come from `CORS_ORIGINS` (comma-separated) or the local demo defaults.
fn cors_layer() -> Result<CorsLayer, axum::http::header::InvalidHeaderValue> {
    let origins = match std::env::var("CORS_ORIGINS") {
        Ok(list) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(HeaderValue::from_str)
            .collect::<Result<Vec<_>, _>>()?,
        Err(_) => DEFAULT_CORS_ORIGINS
            .iter()
            .map(|&origin| HeaderValue::from_static(origin))
            .collect(),
    };

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(CSRF_HEADER),
        ]))
}

/// Runs against the same shared store the router uses.
async fn purge_expired_tokens(csrf: CsrfService<MemoryTokenStore>) {
    let mut interval = tokio::time::interval(PURGE_INTERVAL);
    loop {
        interval.tick().await;
        let purged = csrf.purge_expired();
        if purged > 0 {
            tracing::debug!(purged, "Expired CSRF tokens purged");
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
