//! Bearer-token validation for protected routes
//!
//! Mini-app traffic must carry the fixed `Validator: worldapp` header and a
//! bearer token signed by the identity provider. Tokens are verified RS256
//! against the issuer JWKS, which is cached in-process for ten minutes.

use crate::oidc::{AuthError, UserClaims};
use axum::http::HeaderMap;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::debug;

/// Required value of the `Validator` (and `Frontend`) header
pub const VALIDATOR_VALUE: &str = "worldapp";

/// JWKS cache lifetime, matching the reference deployment
const JWKS_TTL: Duration = Duration::from_secs(600);

/// One signing key from the JWKS document
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key id referenced by token headers
    #[serde(default)]
    pub kid: Option<String>,
    /// Key type; only RSA keys are usable here
    pub kty: String,
    /// RSA modulus, base64url
    #[serde(default)]
    pub n: Option<String>,
    /// RSA exponent, base64url
    #[serde(default)]
    pub e: Option<String>,
}

/// The issuer's key set
#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    /// Published signing keys
    pub keys: Vec<Jwk>,
}

/// Find the decoding key for a token's `kid`
///
/// Falls back to the first RSA key when the token carries no `kid` and the
/// set has exactly one usable key.
pub fn decoding_key_for(jwks: &Jwks, kid: Option<&str>) -> Result<DecodingKey, AuthError> {
    let rsa_keys: Vec<&Jwk> = jwks.keys.iter().filter(|k| k.kty == "RSA").collect();

    let key = match kid {
        Some(kid) => rsa_keys
            .iter()
            .find(|k| k.kid.as_deref() == Some(kid))
            .copied()
            .ok_or_else(|| AuthError::Jwks(format!("no key with kid {}", kid)))?,
        None if rsa_keys.len() == 1 => rsa_keys[0],
        None => return Err(AuthError::Jwks("token has no kid".to_string())),
    };

    let (n, e) = match (key.n.as_deref(), key.e.as_deref()) {
        (Some(n), Some(e)) => (n, e),
        _ => return Err(AuthError::Jwks("RSA key missing components".to_string())),
    };

    DecodingKey::from_rsa_components(n, e).map_err(|e| AuthError::Jwks(e.to_string()))
}

/// In-process JWKS cache with time-based refresh
pub struct JwksCache {
    uri: String,
    http: reqwest::Client,
    state: RwLock<Option<(Instant, Jwks)>>,
}

impl JwksCache {
    /// Create a cache for a JWKS endpoint
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            http: reqwest::Client::new(),
            state: RwLock::new(None),
        }
    }

    /// Seed the cache directly (tests, pinned keys)
    pub fn with_keys(uri: impl Into<String>, jwks: Jwks) -> Self {
        let cache = Self::new(uri);
        *cache.state.write().unwrap() = Some((Instant::now(), jwks));
        cache
    }

    /// Return the cached key set, refreshing when stale
    pub async fn get(&self) -> Result<Jwks, AuthError> {
        if let Some((fetched_at, jwks)) = self.state.read().unwrap().clone() {
            if fetched_at.elapsed() < JWKS_TTL {
                return Ok(jwks);
            }
        }

        debug!(uri = %self.uri, "Refreshing JWKS");
        let response = self
            .http
            .get(&self.uri)
            .send()
            .await
            .map_err(|e| AuthError::Jwks(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Jwks(format!(
                "JWKS endpoint returned HTTP {}",
                response.status()
            )));
        }

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| AuthError::Jwks(e.to_string()))?;

        *self.state.write().unwrap() = Some((Instant::now(), jwks.clone()));
        Ok(jwks)
    }
}

/// Why a bearer token was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenRejection {
    /// `Validator` header absent or wrong
    InvalidValidator,
    /// `Authorization` header absent or not a bearer token
    MissingBearer,
    /// Signature, audience, issuer, or expiry check failed
    InvalidToken,
}

impl TokenRejection {
    /// The 401 body message for this rejection
    pub fn message(&self) -> &'static str {
        match self {
            TokenRejection::InvalidValidator => "Invalid validator header",
            TokenRejection::MissingBearer => "No valid authorization header",
            TokenRejection::InvalidToken => "Invalid or expired token",
        }
    }
}

#[derive(Debug, Deserialize)]
struct BearerClaims {
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

/// Validate the headers of a protected request
///
/// Checks the `Validator` constant, extracts the bearer token, and verifies
/// it against the cached JWKS with the expected audience and issuer.
pub async fn validate_bearer(
    headers: &HeaderMap,
    jwks_cache: &JwksCache,
    audience: &str,
    issuer: &str,
) -> Result<UserClaims, TokenRejection> {
    let validator = headers
        .get("validator")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if validator != VALIDATOR_VALUE {
        return Err(TokenRejection::InvalidValidator);
    }

    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(TokenRejection::MissingBearer)?;

    let jwks = jwks_cache
        .get()
        .await
        .map_err(|_| TokenRejection::InvalidToken)?;

    let header = decode_header(token).map_err(|_| TokenRejection::InvalidToken)?;
    let key =
        decoding_key_for(&jwks, header.kid.as_deref()).map_err(|_| TokenRejection::InvalidToken)?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[audience]);
    validation.set_issuer(&[issuer]);

    let data = decode::<BearerClaims>(token, &key, &validation)
        .map_err(|_| TokenRejection::InvalidToken)?;

    let claims = data.claims;
    Ok(UserClaims {
        sub: claims.sub,
        name: claims.name,
        email: claims.email,
        verification_level: claims.world.and_then(|w| w.verification_level),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn empty_cache() -> JwksCache {
        JwksCache::with_keys("https://id.worldcoin.org/jwks.json", Jwks { keys: Vec::new() })
    }

    #[tokio::test]
    async fn test_missing_validator_header() {
        let headers = HeaderMap::new();
        let result = validate_bearer(
            &headers,
            &empty_cache(),
            "app_abc",
            "https://id.worldcoin.org",
        )
        .await;
        assert_eq!(result, Err(TokenRejection::InvalidValidator));
    }

    #[tokio::test]
    async fn test_wrong_validator_value() {
        let mut headers = HeaderMap::new();
        headers.insert("validator", HeaderValue::from_static("someoneelse"));
        let result = validate_bearer(
            &headers,
            &empty_cache(),
            "app_abc",
            "https://id.worldcoin.org",
        )
        .await;
        assert_eq!(result, Err(TokenRejection::InvalidValidator));
    }

    #[tokio::test]
    async fn test_missing_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert("validator", HeaderValue::from_static(VALIDATOR_VALUE));
        let result = validate_bearer(
            &headers,
            &empty_cache(),
            "app_abc",
            "https://id.worldcoin.org",
        )
        .await;
        assert_eq!(result, Err(TokenRejection::MissingBearer));
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("validator", HeaderValue::from_static(VALIDATOR_VALUE));
        headers.insert(
            "authorization",
            HeaderValue::from_static("Bearer not-a-jwt"),
        );
        let result = validate_bearer(
            &headers,
            &empty_cache(),
            "app_abc",
            "https://id.worldcoin.org",
        )
        .await;
        assert_eq!(result, Err(TokenRejection::InvalidToken));
    }

    #[test]
    fn test_decoding_key_requires_matching_kid() {
        let jwks = Jwks {
            keys: vec![Jwk {
                kid: Some("key-1".to_string()),
                kty: "RSA".to_string(),
                n: Some("AQAB".to_string()),
                e: Some("AQAB".to_string()),
            }],
        };

        assert!(decoding_key_for(&jwks, Some("key-1")).is_ok());
        assert!(decoding_key_for(&jwks, Some("key-2")).is_err());
        // Single usable key also satisfies a kid-less token
        assert!(decoding_key_for(&jwks, None).is_ok());
    }

    #[test]
    fn test_decoding_key_skips_non_rsa() {
        let jwks = Jwks {
            keys: vec![Jwk {
                kid: Some("ec-key".to_string()),
                kty: "EC".to_string(),
                n: None,
                e: None,
            }],
        };
        assert!(decoding_key_for(&jwks, Some("ec-key")).is_err());
    }
}
