//! Development bearer-token authentication.
//!
//! `POST /api/auth/login` with the configured dev password issues a random
//! `crm_dev_` token held in memory until it expires. Production deployments
//! should put a real identity provider in front of the API.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use crm_core::config::AuthConfig;
use dashmap::DashMap;
use rand::Rng;
use tracing::debug;

use crate::handlers::ManagementState;
use crate::models::{ErrorResponse, LoginRequest, LoginResponse};

const DEV_TOKEN_PREFIX: &str = "crm_dev_";

/// Username attached to an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

#[derive(Debug, Clone)]
struct Session {
    user: String,
    expires_at: DateTime<Utc>,
}

/// Issued tokens and their owners.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a login request and issue a bearer token. Expired sessions
    /// are pruned first.
    pub fn login(&self, config: &AuthConfig, req: &LoginRequest) -> Result<LoginResponse, String> {
        let user = req.username.trim();
        if user.is_empty() || req.password != config.dev_password {
            return Err("Invalid credentials".to_string());
        }
        let now = Utc::now();
        self.sessions.retain(|_, session| session.expires_at > now);

        let token = generate_token();
        let expires_at = Duration::try_hours(config.token_ttl_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.sessions.insert(
            token.clone(),
            Session {
                user: user.to_string(),
                expires_at,
            },
        );
        Ok(LoginResponse {
            token,
            user: user.to_string(),
            expires_at,
        })
    }

    /// Owner of a live token. Expired tokens are dropped on lookup.
    pub fn user_for(&self, token: &str) -> Option<String> {
        if !token.starts_with(DEV_TOKEN_PREFIX) {
            return None;
        }
        let session = self.sessions.get(token)?.value().clone();
        if session.expires_at <= Utc::now() {
            self.sessions.remove(token);
            return None;
        }
        Some(session.user)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 24] = rng.gen();
    format!(
        "{}{}",
        DEV_TOKEN_PREFIX,
        bytes.iter().map(|b| format!("{:02x}", b)).collect::<String>()
    )
}

fn unauthorized(error: &str, message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// Requires a bearer token on `/api/*`, except login and the vendor receipt
/// webhook. Everything passes when auth is disabled.
pub async fn auth_middleware(
    State(state): State<ManagementState>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path();
    let public = path == "/api/auth/login" || path == "/api/receipt" || !path.starts_with("/api/");

    if !state.auth.enabled {
        req.extensions_mut().insert(AuthUser("admin".to_string()));
        return next.run(req).await;
    }
    if public {
        return next.run(req).await;
    }

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match token {
        Some(token) => match state.sessions.user_for(token) {
            Some(user) => {
                req.extensions_mut().insert(AuthUser(user));
                next.run(req).await
            }
            None => {
                debug!("Rejected unknown or expired token");
                unauthorized("invalid_token", "Invalid or expired bearer token")
            }
        },
        None => unauthorized(
            "missing_auth",
            "Authorization header with Bearer token required",
        ),
    }
}
