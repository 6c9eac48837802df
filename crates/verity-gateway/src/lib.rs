//! Verity Gateway
//!
//! Session-backed OIDC login against the World ID identity provider plus a
//! restricted server-key proxy for the fact-check backend. The browser only
//! ever holds a signed session cookie; PKCE verifiers, tokens, and the API
//! key stay server-side.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;
pub mod oidc;
pub mod session;
pub mod validate;

use config::GatewayConfig;
use handlers::{create_router, AppState};
use oidc::OidcClient;
use session::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use validate::JwksCache;

/// Gateway error
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Start the Gateway HTTP server
///
/// Initializes the session store, OIDC client, and JWKS cache, then serves
/// the axum router until the process ends.
pub async fn start_server(config: GatewayConfig) -> Result<(), GatewayError> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Verity Gateway");
    info!("Bind address: {}", config.bind_addr());
    info!("Issuer: {}", config.issuer_url);
    info!("Session TTL: {} seconds", config.session_ttl_secs);

    let sessions = Arc::new(SessionStore::new(
        config.auth_secret.clone(),
        Duration::from_secs(config.session_ttl_secs),
    ));

    let oidc = Arc::new(OidcClient::new(
        config.issuer_url.clone(),
        config.client_id.clone(),
        config.client_secret.clone(),
        config.callback_url.clone(),
    ));

    // The discovery document names the real JWKS URI; this default matches
    // the issuer's published layout and is only used before first discovery
    let jwks = Arc::new(JwksCache::new(format!(
        "{}/jwks.json",
        config.issuer_url.trim_end_matches('/')
    )));

    let state = AppState {
        sessions,
        oidc,
        jwks,
        config: Arc::new(config.clone()),
        http: reqwest::Client::new(),
    };

    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Gateway listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .await
        .map_err(|e| GatewayError::Server(e.to_string()))?;

    Ok(())
}
