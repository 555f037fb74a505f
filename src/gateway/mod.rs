//! Axum-based HTTP boundary for the auth core.
//!
//! Hardening applied at this layer:
//! - Request body size limit (hyper validates Content-Length)
//! - Request timeouts to prevent slow-loris abuse
//! - Sliding-window rate limiting on login attempts, keyed by client IP

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::auth::{AuthError, AuthService, LoginCredentials, TokenStore};
use crate::config::Config;
use crate::directory::build_directory;

pub const SERVICE_NAME: &str = "passgate";

/// Maximum request body size (64KB). Login bodies are tiny; anything
/// bigger is abuse.
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s): covers a directory round-trip plus a bcrypt
/// comparison with margin.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
/// Sliding window used by login rate limiting.
pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// How often the rate limiter sweeps stale IP entries from its map.
const RATE_LIMITER_SWEEP_INTERVAL_SECS: u64 = 300; // 5 minutes

/// Sliding-window limiter for login attempts, keyed by client IP.
#[derive(Debug)]
pub struct LoginRateLimiter {
    limit_per_window: u32,
    window: Duration,
    attempts: Mutex<(HashMap<String, Vec<Instant>>, Instant)>,
}

impl LoginRateLimiter {
    pub fn new(limit_per_window: u32) -> Self {
        Self {
            limit_per_window,
            window: Duration::from_secs(RATE_LIMIT_WINDOW_SECS),
            attempts: Mutex::new((HashMap::new(), Instant::now())),
        }
    }

    fn allow(&self, key: &str) -> bool {
        if self.limit_per_window == 0 {
            return true;
        }

        let now = Instant::now();
        let cutoff = now.checked_sub(self.window).unwrap_or_else(Instant::now);

        let mut guard = self.attempts.lock();
        let (attempts, last_sweep) = &mut *guard;

        // Periodic sweep: drop IPs with no attempts inside the window
        if last_sweep.elapsed() >= Duration::from_secs(RATE_LIMITER_SWEEP_INTERVAL_SECS) {
            attempts.retain(|_, timestamps| {
                timestamps.retain(|t| *t > cutoff);
                !timestamps.is_empty()
            });
            *last_sweep = now;
        }

        let entry = attempts.entry(key.to_owned()).or_default();
        entry.retain(|instant| *instant > cutoff);

        if entry.len() >= self.limit_per_window as usize {
            return false;
        }

        entry.push(now);
        true
    }
}

/// Best-effort client key from proxy headers; a bare deployment collapses
/// to one bucket, which is still a global brute-force cap.
fn client_key_from_headers(headers: &HeaderMap) -> String {
    for header_name in ["X-Forwarded-For", "X-Real-IP"] {
        if let Some(value) = headers.get(header_name).and_then(|v| v.to_str().ok()) {
            let first = value.split(',').next().unwrap_or("").trim();
            if !first.is_empty() {
                return first.to_owned();
            }
        }
    }
    "unknown".into()
}

/// Shared state for all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub rate_limiter: Arc<LoginRateLimiter>,
}

/// Concrete return type for handlers (avoids `impl IntoResponse` inference
/// issues).
type ApiResponse = (StatusCode, Json<serde_json::Value>);

/// Request body for login.
#[derive(Debug, Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

/// Extract the token from a standard `Authorization: Bearer <token>`
/// header. Absent or malformed headers are "no token", never an error.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

fn error_response(err: &AuthError) -> ApiResponse {
    let status =
        StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"error": err.to_string()})))
}

/// POST /auth/login — verify credentials, issue a bearer token.
async fn handle_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<LoginBody>, axum::extract::rejection::JsonRejection>,
) -> ApiResponse {
    let client_key = client_key_from_headers(&headers);
    if !state.rate_limiter.allow(&client_key) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": "Too many login attempts, retry later"})),
        );
    }

    let body = match body {
        Ok(Json(b)) => b,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": format!("Invalid request: {e}")})),
            );
        }
    };

    match state
        .auth
        .login(LoginCredentials {
            username: body.username,
            password: body.password,
        })
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "token": outcome.token,
                "user": outcome.user,
            })),
        ),
        Err(e) => error_response(&e),
    }
}

/// POST /auth/logout — revoke the presented token.
///
/// Always `200 {ok: true}`: logout is idempotent, and a missing or
/// malformed header simply means there is nothing to revoke.
async fn handle_logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    state.auth.logout(extract_bearer_token(&headers));
    (StatusCode::OK, Json(json!({"ok": true})))
}

/// GET /auth/me — public record of the authenticated user.
///
/// Anonymous (no token, unknown token, or a since-deleted user) is a valid
/// state reported as `{"user": null}`, not an error.
async fn handle_me(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    let Some(token) = extract_bearer_token(&headers) else {
        return (StatusCode::OK, Json(json!({"user": null})));
    };

    match state.auth.current_user(token).await {
        Ok(Some(user)) => (StatusCode::OK, Json(json!({"user": user}))),
        Ok(None) => (StatusCode::OK, Json(json!({"user": null}))),
        Err(e) => error_response(&e),
    }
}

/// GET /health — liveness plus the live session count.
async fn handle_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "active_tokens": state.auth.active_tokens(),
    }))
}

/// Assemble the router with hardening layers.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/auth/login", post(handle_login))
        .route("/auth/logout", post(handle_logout))
        .route("/auth/me", get(handle_me))
        .route("/health", get(handle_health))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP gateway until interrupted.
pub async fn run_gateway(config: &Config) -> Result<()> {
    let directory = build_directory(&config.directory)?;
    let auth = Arc::new(AuthService::new(directory, Arc::new(TokenStore::new())));
    let state = AppState {
        auth,
        rate_limiter: Arc::new(LoginRateLimiter::new(
            config.gateway.login_rate_limit_per_minute,
        )),
    };

    let addr: SocketAddr = format!("{}:{}", config.gateway.host, config.gateway.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual = listener.local_addr()?;

    println!("🔐 passgate listening on http://{actual}");
    println!("  POST /auth/login  — authenticate, receive a bearer token");
    println!("  POST /auth/logout — revoke the presented token");
    println!("  GET  /auth/me     — current user for a bearer token");
    println!("  GET  /health      — liveness + live session count");

    tracing::info!(%actual, backend = ?config.directory.backend, "gateway started");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to install ctrl-c handler: {e}");
    }
}
