//! HTTP request handlers for the Gateway service.
//!
//! Implements the OIDC login flow, session introspection, logout, the
//! restricted backend proxy, and health check endpoints using axum.

use crate::config::GatewayConfig;
use crate::oidc::{generate_pkce, generate_state, AuthError, OidcClient};
use crate::session::{PendingLogin, SessionStore, SESSION_COOKIE};
use crate::validate::{validate_bearer, JwksCache, TokenRejection, VALIDATOR_VALUE};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, warn};

/// Endpoints the proxy will forward; everything else is rejected
const PROXY_ALLOWED: [&str; 2] = ["/extract-claim", "/fact-check-sync"];

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Server-side session store
    pub sessions: Arc<SessionStore>,
    /// OIDC client for the login flow
    pub oidc: Arc<OidcClient>,
    /// Cached identity-provider signing keys
    pub jwks: Arc<JwksCache>,
    /// Gateway configuration
    pub config: Arc<GatewayConfig>,
    /// Outbound HTTP client for the proxy
    pub http: reqwest::Client,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall status
    pub status: String,
    /// Live server-side sessions
    pub sessions: usize,
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always false on errors
    pub success: bool,
    /// Error message
    pub error: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Login flow failure; surfaces as a generic authentication error
    Auth(AuthError),
    /// Bearer validation failure on a protected route
    Token(TokenRejection),
    /// Malformed or disallowed request
    BadRequest(String),
    /// Server configuration problem
    Misconfigured(String),
    /// The external backend could not be reached
    Upstream(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            // The browser lands here mid-redirect; keep the page generic and
            // log the specifics server-side
            AppError::Auth(e) => {
                error!(error = %e, "OIDC flow failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error").into_response()
            }
            AppError::Token(rejection) => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    success: false,
                    error: rejection.message().to_string(),
                }),
            )
                .into_response(),
            AppError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    success: false,
                    error: message,
                }),
            )
                .into_response(),
            AppError::Misconfigured(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    success: false,
                    error: message,
                }),
            )
                .into_response(),
            AppError::Upstream(message) => (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    success: false,
                    error: message,
                }),
            )
                .into_response(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Auth(e)
    }
}

/// Extract and verify the session id from the request cookies
fn session_from_headers(headers: &HeaderMap, sessions: &SessionStore) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in cookie_header.split(';') {
        if let Some((name, value)) = pair.trim().split_once('=') {
            if name == SESSION_COOKIE {
                return sessions.verify(value);
            }
        }
    }
    None
}

fn set_cookie(value: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, value
    )
}

fn clear_cookie() -> String {
    format!("{}=deleted; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE)
}

/// GET /auth/login - Start the authorization-code + PKCE flow
///
/// Stores the verifier server-side and redirects the browser to the
/// identity provider.
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (session_id, is_new) = match session_from_headers(&headers, &state.sessions) {
        Some(id) if state.sessions.exists(&id) => (id, false),
        _ => (state.sessions.create(), true),
    };

    let pkce = generate_pkce();
    let nonce = generate_state();
    state.sessions.set_pending(
        &session_id,
        PendingLogin {
            code_verifier: pkce.verifier,
            state: nonce.clone(),
        },
    );

    let url = state.oidc.authorization_url(&pkce.challenge, &nonce).await?;

    let mut response = Redirect::to(&url).into_response();
    if is_new {
        let cookie = set_cookie(&state.sessions.sign(&session_id));
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| AppError::Misconfigured(e.to_string()))?;
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    Ok(response)
}

/// Callback query parameters
#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// GET /auth/callback - Complete the login
///
/// Exchanges the code using the stored verifier, verifies the id token, and
/// stores the minimal claim set in the session. Any failure leaves the
/// session anonymous.
async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let session_id = session_from_headers(&headers, &state.sessions)
        .filter(|id| state.sessions.exists(id))
        .ok_or(AppError::Auth(AuthError::StateMismatch))?;

    let pending = state
        .sessions
        .take_pending(&session_id)
        .ok_or(AppError::Auth(AuthError::StateMismatch))?;

    if let Some(error) = params.error {
        return Err(AppError::Auth(AuthError::TokenExchange(error)));
    }
    if params.state.as_deref() != Some(pending.state.as_str()) {
        return Err(AppError::Auth(AuthError::StateMismatch));
    }
    let code = params
        .code
        .ok_or_else(|| AppError::Auth(AuthError::TokenExchange("missing code".to_string())))?;

    let tokens = state
        .oidc
        .exchange_code(&code, &pending.code_verifier)
        .await?;

    let jwks = state.jwks.get().await?;
    let user = state.oidc.verify_id_token(&tokens.id_token, &jwks)?;

    state.sessions.set_user(&session_id, user);

    Ok(Redirect::to(&state.config.frontend_url).into_response())
}

/// GET /auth/me - The authenticated user, or 401 with a null user
async fn me(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user = session_from_headers(&headers, &state.sessions)
        .and_then(|id| state.sessions.user(&id));

    match user {
        Some(user) => Json(json!({ "user": user })).into_response(),
        None => (StatusCode::UNAUTHORIZED, Json(json!({ "user": null }))).into_response(),
    }
}

/// POST /auth/logout - Destroy the session; idempotent
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(session_id) = session_from_headers(&headers, &state.sessions) {
        state.sessions.destroy(&session_id);
    }

    let mut response = Json(json!({ "ok": true })).into_response();
    if let Ok(value) = HeaderValue::from_str(&clear_cookie()) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

/// Proxy request body
#[derive(Debug, Deserialize)]
struct ProxyRequest {
    endpoint: String,
    #[serde(default)]
    payload: Value,
}

/// POST /proxy - Forward an allow-listed endpoint to the backend
///
/// Attaches the server-held API key so it never reaches the browser, and
/// passes the upstream status and body straight through.
async fn proxy(
    State(state): State<AppState>,
    Json(request): Json<ProxyRequest>,
) -> Result<Response, AppError> {
    let api_key = state.config.fact_check_api_key.as_ref().ok_or_else(|| {
        AppError::Misconfigured("Server misconfiguration: FACT_CHECK_API_KEY not set".to_string())
    })?;

    if !PROXY_ALLOWED.contains(&request.endpoint.as_str()) {
        return Err(AppError::BadRequest(
            "Invalid or disallowed endpoint".to_string(),
        ));
    }

    let url = format!("{}{}", state.config.api_base_url, request.endpoint);
    let upstream = state
        .http
        .post(&url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Validator", VALIDATOR_VALUE)
        .header("Frontend", VALIDATOR_VALUE)
        .json(&request.payload)
        .send()
        .await
        .map_err(|e| {
            warn!(error = %e, endpoint = %request.endpoint, "Proxy call failed");
            AppError::Upstream(e.to_string())
        })?;

    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let text = upstream
        .text()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
    Ok((status, Json(body)).into_response())
}

/// POST /api/protected - Example bearer-validated route
async fn protected(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match validate_bearer(
        &headers,
        &state.jwks,
        state.oidc.client_id(),
        &state.config.issuer_url,
    )
    .await
    {
        Ok(user) => Json(json!({ "success": true, "user": user })).into_response(),
        Err(rejection) => AppError::Token(rejection).into_response(),
    }
}

/// GET /health - Liveness check
async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "ok".to_string(),
        sessions: state.sessions.len(),
    })
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> AxumRouter {
    AxumRouter::new()
        .route("/auth/login", get(login))
        .route("/auth/callback", get(callback))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
        .route("/proxy", post(proxy))
        .route("/api/protected", post(protected))
        .route("/health", get(health_check))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oidc::ProviderMetadata;
    use crate::validate::Jwks;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt; // for oneshot

    fn create_test_state(with_api_key: bool) -> AppState {
        let mut config = GatewayConfig::default_test_config();
        if with_api_key {
            config.fact_check_api_key = Some("server-key".to_string());
        }

        let metadata = ProviderMetadata {
            issuer: config.issuer_url.clone(),
            authorization_endpoint: format!("{}/authorize", config.issuer_url),
            token_endpoint: format!("{}/token", config.issuer_url),
            jwks_uri: format!("{}/jwks.json", config.issuer_url),
        };

        let oidc = OidcClient::with_metadata(
            config.client_id.clone(),
            config.client_secret.clone(),
            config.callback_url.clone(),
            metadata,
        );

        AppState {
            sessions: Arc::new(SessionStore::new(
                config.auth_secret.clone(),
                Duration::from_secs(config.session_ttl_secs),
            )),
            oidc: Arc::new(oidc),
            jwks: Arc::new(JwksCache::with_keys(
                format!("{}/jwks.json", config.issuer_url),
                Jwks { keys: Vec::new() },
            )),
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_router(create_test_state(false));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_me_without_session_is_401() {
        let app = create_router(create_test_state(false));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["user"], Value::Null);
    }

    #[tokio::test]
    async fn test_login_redirects_with_pkce() {
        let state = create_test_state(false);
        let app = create_router(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/login")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(location.starts_with("https://id.worldcoin.org/authorize?"));
        assert!(location.contains("code_challenge="));
        assert!(location.contains("code_challenge_method=S256"));
        assert!(location.contains("state="));

        // A fresh session was created and handed to the browser
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.starts_with(SESSION_COOKIE));
        assert!(cookie.contains("HttpOnly"));
        assert_eq!(state.sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_callback_without_session_is_auth_error() {
        let app = create_router(create_test_state(false));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/callback?code=abc&state=xyz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        // Generic failure; the session stays anonymous
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let app = create_router(create_test_state(false));

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/auth/logout")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let body = body_json(response).await;
            assert_eq!(body["ok"], true);
        }
    }

    #[tokio::test]
    async fn test_proxy_rejects_disallowed_endpoint() {
        let app = create_router(create_test_state(true));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/proxy")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"endpoint": "/reward_point", "payload": {}}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid or disallowed endpoint");
    }

    #[tokio::test]
    async fn test_proxy_without_api_key_is_misconfiguration() {
        let app = create_router(create_test_state(false));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/proxy")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"endpoint": "/extract-claim", "payload": {}}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_protected_requires_validator_header() {
        let app = create_router(create_test_state(false));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/protected")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid validator header");
    }
}
