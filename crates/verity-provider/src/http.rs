//! HTTP implementation of the fact-check backend client
//!
//! Talks JSON over HTTPS to the external provider. Every request carries the
//! fixed `Validator`/`Frontend` headers the backend uses to distinguish
//! trusted mini-app traffic, plus a bearer credential when one is configured.
//!
//! Claim extraction and verification accept an anonymous caller (the gateway
//! proxy path); the remaining endpoints return [`ProviderError::Unauthorized`]
//! before any network call when no credential is present. Nothing here
//! retries: each call is attempted exactly once.

use crate::decode::decode_check_response;
use crate::{CheckBackend, CheckOutcome, CheckRequest, ProviderError, RewardOutcome, RewardRequest};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use verity_domain::{CreditSnapshot, ExtractedClaim, SessionId};

/// Default backend endpoint for local development
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Value of the `Validator` and `Frontend` headers on every request
pub const VALIDATOR_VALUE: &str = "worldapp";

/// How the client authenticates against the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// A user access token from the identity provider
    Bearer(String),
    /// A server-held API key (machine mode, used by the gateway proxy)
    ApiKey(String),
    /// No credential; only extraction and verification are callable
    Anonymous,
}

impl Credential {
    /// The `Authorization` header value, when a credential is present
    fn header_value(&self) -> Option<String> {
        match self {
            Credential::Bearer(token) | Credential::ApiKey(token) => {
                Some(format!("Bearer {}", token))
            }
            Credential::Anonymous => None,
        }
    }

    fn is_present(&self) -> bool {
        !matches!(self, Credential::Anonymous)
    }
}

/// Fixed parameters sent with every verification request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    /// Deployment identifier reported to the backend
    pub deployment_mode: String,
    /// Protocol version string
    pub version: String,
    /// Verification mode
    pub mode: String,
    /// Caller location hint, empty when unknown
    pub location: String,
    /// Media source, empty for plain text claims
    pub source: String,
    /// Source discovery strategy
    pub source_find_mode: String,
    /// URL reported as the requesting page
    pub requester_url: String,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            deployment_mode: VALIDATOR_VALUE.to_string(),
            version: "v2".to_string(),
            mode: "sync".to_string(),
            location: String::new(),
            source: String::new(),
            source_find_mode: "default".to_string(),
            requester_url: "worldapp://verity".to_string(),
        }
    }
}

/// reqwest-backed client for the external fact-check backend
pub struct HttpBackend {
    base_url: String,
    credential: Credential,
    options: CheckOptions,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ExtractClaimBody<'a> {
    query: &'a str,
    timestamp: bool,
    claim_extraction: bool,
}

#[derive(Serialize)]
struct FactCheckBody<'a> {
    deployment_mode: &'a str,
    is_longcheck: bool,
    location: &'a str,
    mode: &'a str,
    query: &'a str,
    requester_url: &'a str,
    source: &'a str,
    source_find_mode: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    speaker: Option<&'a str>,
    timeout: u64,
    timestamp: bool,
    #[serde(rename = "userEmail", skip_serializing_if = "Option::is_none")]
    user_email: Option<&'a str>,
    version: &'a str,
}

#[derive(Serialize)]
struct AttachTaskIdBody<'a> {
    #[serde(rename = "_id")]
    id: &'a str,
    task_id: &'a str,
    link: &'a str,
    mode: &'a str,
}

#[derive(Serialize)]
struct CheckCreditsBody<'a> {
    wallet_id: &'a str,
}

impl HttpBackend {
    /// Create a client for the given backend with a credential
    pub fn new(base_url: impl Into<String>, credential: Credential) -> Self {
        Self {
            base_url: base_url.into(),
            credential,
            options: CheckOptions::default(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the fixed verification parameters
    pub fn with_options(mut self, options: CheckOptions) -> Self {
        self.options = options;
        self
    }

    /// Build a request with the fixed header set and optional credential
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self
            .client
            .request(method, url)
            .header("Validator", VALIDATOR_VALUE)
            .header("Frontend", VALIDATOR_VALUE);

        if let Some(authorization) = self.credential.header_value() {
            builder = builder.header("Authorization", authorization);
        }
        builder
    }

    /// Fail fast with a 401-shaped error when no credential is configured
    fn require_credential(&self) -> Result<(), ProviderError> {
        if self.credential.is_present() {
            Ok(())
        } else {
            Err(ProviderError::Unauthorized)
        }
    }

    async fn read_error(response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        // Backend errors usually carry a JSON `message`; fall back to the body
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("HTTP error! status: {}", status)
                } else {
                    body.trim().to_string()
                }
            });

        ProviderError::Http { status, message }
    }
}

/// Interpret the extractor's `claims` array
///
/// Elements are either bare strings or objects with a `claim`/`text` field
/// and an optional `speaker`. Anything else is skipped with a warning;
/// extractor order is preserved.
pub(crate) fn parse_claim_descriptors(payload: &Value) -> Vec<ExtractedClaim> {
    let Some(items) = payload.get("claims").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut claims = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        match item {
            Value::String(text) if !text.trim().is_empty() => {
                claims.push(ExtractedClaim::new(text.trim()));
            }
            Value::Object(fields) => {
                let text = fields
                    .get("claim")
                    .or_else(|| fields.get("text"))
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|t| !t.is_empty());

                match text {
                    Some(text) => {
                        let mut claim = ExtractedClaim::new(text);
                        if let Some(speaker) = fields.get("speaker").and_then(Value::as_str) {
                            if !speaker.trim().is_empty() {
                                claim = claim.with_speaker(speaker.trim());
                            }
                        }
                        claims.push(claim);
                    }
                    None => warn!("Claim descriptor {} has no usable text", idx),
                }
            }
            _ => warn!("Skipping claim descriptor {} of unexpected shape", idx),
        }
    }
    claims
}

#[async_trait]
impl CheckBackend for HttpBackend {
    async fn extract_claims(&self, query: &str) -> Result<Vec<ExtractedClaim>, ProviderError> {
        let body = ExtractClaimBody {
            query,
            timestamp: true,
            claim_extraction: true,
        };

        let response = self
            .request(reqwest::Method::POST, "/extract-claim")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Communication(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let claims = parse_claim_descriptors(&payload);
        debug!("Extractor returned {} claims", claims.len());
        Ok(claims)
    }

    async fn fact_check(&self, request: &CheckRequest) -> Result<CheckOutcome, ProviderError> {
        let body = FactCheckBody {
            deployment_mode: &self.options.deployment_mode,
            is_longcheck: false,
            location: &self.options.location,
            mode: &self.options.mode,
            query: &request.claim,
            requester_url: &self.options.requester_url,
            source: &self.options.source,
            source_find_mode: &self.options.source_find_mode,
            speaker: request.speaker.as_deref(),
            timeout: request.timeout_secs,
            timestamp: true,
            user_email: request.user_email.as_deref(),
            version: &self.options.version,
        };

        let response = self
            .request(reqwest::Method::POST, "/fact-check-sync")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Communication(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::read_error(response).await);
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let decoded = decode_check_response(&text);
        Ok(CheckOutcome {
            verdict: decoded.verdict,
            verifying_sources: decoded.verifying_sources,
            task_id: decoded.task_id,
            raw: decoded.raw,
            status: status.as_u16(),
        })
    }

    async fn attach_task_id(
        &self,
        session_id: &SessionId,
        task_id: &str,
    ) -> Result<(), ProviderError> {
        self.require_credential()?;

        let body = AttachTaskIdBody {
            id: session_id.as_str(),
            task_id,
            link: "",
            mode: "verify",
        };

        let response = self
            .request(reqwest::Method::POST, "/add_task_id")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Communication(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        Ok(())
    }

    async fn check_credits(&self, wallet_id: &str) -> Result<CreditSnapshot, ProviderError> {
        self.require_credential()?;

        let response = self
            .request(reqwest::Method::POST, "/check_credits_util")
            .json(&CheckCreditsBody { wallet_id })
            .send()
            .await
            .map_err(|e| ProviderError::Communication(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    async fn get_user_profile(&self, wallet_id: &str) -> Result<Value, ProviderError> {
        self.require_credential()?;

        let response = self
            .request(reqwest::Method::GET, "/get-user-web3")
            .query(&[("wallet_id", wallet_id)])
            .send()
            .await
            .map_err(|e| ProviderError::Communication(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    async fn reward_points(&self, request: &RewardRequest) -> Result<RewardOutcome, ProviderError> {
        self.require_credential()?;

        let response = self
            .request(reqwest::Method::POST, "/reward_point")
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Communication(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}
