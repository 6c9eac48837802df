//! OIDC client for the authorization-code + PKCE flow
//!
//! Thin wrapper over the identity provider's discovery document: builds the
//! authorization URL, exchanges the code for tokens, and verifies the id
//! token RS256-signature against the issuer JWKS. No token refresh and no
//! revocation; the session store is the only state.

use crate::validate::{decoding_key_for, Jwks};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Authentication error
#[derive(Debug, Error)]
pub enum AuthError {
    /// Discovery document could not be fetched or parsed
    #[error("OIDC discovery failed: {0}")]
    Discovery(String),

    /// The token endpoint rejected the code exchange
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// JWKS could not be fetched or no key matched
    #[error("JWKS error: {0}")]
    Jwks(String),

    /// The id token failed verification
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The callback state did not match the pending login
    #[error("State mismatch in callback")]
    StateMismatch,
}

/// The subset of the discovery document this flow needs
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer identifier, must match the `iss` claim
    pub issuer: String,
    /// Where to send the browser
    pub authorization_endpoint: String,
    /// Where to exchange the code
    pub token_endpoint: String,
    /// Where the signing keys live
    pub jwks_uri: String,
}

/// PKCE verifier/challenge pair (S256)
#[derive(Debug, Clone)]
pub struct PkcePair {
    /// The secret kept server-side in the session
    pub verifier: String,
    /// The derived challenge sent with the authorization request
    pub challenge: String,
}

/// Generate a fresh PKCE pair: 32 random bytes, base64url without padding
pub fn generate_pkce() -> PkcePair {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let verifier = URL_SAFE_NO_PAD.encode(bytes);
    let challenge = challenge_for(&verifier);
    PkcePair {
        verifier,
        challenge,
    }
}

/// Derive the S256 challenge for a verifier
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Generate a random state nonce for CSRF protection
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer token for backend calls
    pub access_token: String,
    /// Signed identity assertion
    pub id_token: String,
    /// Token type, "Bearer"
    #[serde(default)]
    pub token_type: String,
    /// Access token lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Minimal claim set stored in the session after login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    /// Subject identifier (the wallet address for this provider)
    pub sub: String,
    /// Display name, when released
    #[serde(default)]
    pub name: Option<String>,
    /// Email, when released
    #[serde(default)]
    pub email: Option<String>,
    /// Identity verification level from the provider-specific claim
    #[serde(default)]
    pub verification_level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(rename = "https://id.worldcoin.org/v1", default)]
    world: Option<WorldClaim>,
}

#[derive(Debug, Deserialize)]
struct WorldClaim {
    #[serde(default)]
    verification_level: Option<String>,
}

/// OIDC client bound to one issuer and one registered application
pub struct OidcClient {
    issuer_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    http: reqwest::Client,
    metadata: OnceCell<ProviderMetadata>,
}

impl OidcClient {
    /// Create a client; discovery happens lazily on first use
    pub fn new(
        issuer_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            issuer_url: issuer_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            http: reqwest::Client::new(),
            metadata: OnceCell::new(),
        }
    }

    /// Create a client with pre-resolved metadata (tests, pinned deployments)
    pub fn with_metadata(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
        metadata: ProviderMetadata,
    ) -> Self {
        let issuer_url = metadata.issuer.clone();
        let cell = OnceCell::new();
        // A fresh cell accepts exactly one value
        cell.set(metadata).ok();
        Self {
            issuer_url,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            http: reqwest::Client::new(),
            metadata: cell,
        }
    }

    /// The registered client id
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Fetch (once) and return the discovery document
    pub async fn metadata(&self) -> Result<&ProviderMetadata, AuthError> {
        self.metadata
            .get_or_try_init(|| async {
                let url = format!(
                    "{}/.well-known/openid-configuration",
                    self.issuer_url.trim_end_matches('/')
                );
                debug!(%url, "Fetching OIDC discovery document");

                let response = self
                    .http
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| AuthError::Discovery(e.to_string()))?;

                if !response.status().is_success() {
                    return Err(AuthError::Discovery(format!(
                        "discovery returned HTTP {}",
                        response.status()
                    )));
                }

                let metadata: ProviderMetadata = response
                    .json()
                    .await
                    .map_err(|e| AuthError::Discovery(e.to_string()))?;

                info!(issuer = %metadata.issuer, "OIDC discovery complete");
                Ok(metadata)
            })
            .await
    }

    /// Build the authorization URL for a login redirect
    pub async fn authorization_url(
        &self,
        challenge: &str,
        state: &str,
    ) -> Result<String, AuthError> {
        let metadata = self.metadata().await?;
        Ok(format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}&code_challenge={}&code_challenge_method=S256",
            metadata.authorization_endpoint,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode("openid profile email"),
            urlencoding::encode(state),
            urlencoding::encode(challenge),
        ))
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, AuthError> {
        let metadata = self.metadata().await?;

        let response = self
            .http
            .post(&metadata.token_endpoint)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &self.redirect_uri),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("code_verifier", code_verifier),
            ])
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenExchange(format!(
                "HTTP {}: {}",
                status,
                body.trim()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))
    }

    /// Verify an id token against the issuer JWKS and extract the claim set
    pub fn verify_id_token(&self, id_token: &str, jwks: &Jwks) -> Result<UserClaims, AuthError> {
        let header = decode_header(id_token).map_err(|_| AuthError::InvalidToken)?;
        let key = decoding_key_for(jwks, header.kid.as_deref())?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.client_id]);
        validation.set_issuer(&[&self.issuer_url]);

        let data = decode::<IdTokenClaims>(id_token, &key, &validation)
            .map_err(|_| AuthError::InvalidToken)?;

        let claims = data.claims;
        Ok(UserClaims {
            sub: claims.sub,
            name: claims.name,
            email: claims.email,
            verification_level: claims.world.and_then(|w| w.verification_level),
        })
    }
}
