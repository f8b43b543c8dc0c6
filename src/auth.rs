//! Bearer-token authentication for the HTTP transport.
//!
//! Tokens come from `--auth-token` / `MCP_AUTH_TOKENS`. With no tokens
//! configured the middleware is not installed and every request is served.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

const BEARER_PREFIX: &str = "Bearer ";

/// Set of accepted bearer tokens.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    tokens: Vec<String>,
}

impl AuthConfig {
    /// Build from configured tokens. Blank entries are a configuration error.
    pub fn from_tokens(tokens: &[String]) -> Result<Self, String> {
        let mut accepted: Vec<String> = Vec::with_capacity(tokens.len());
        for token in tokens {
            let trimmed = token.trim();
            if trimmed.is_empty() {
                return Err("Empty token value in MCP_AUTH_TOKENS".to_string());
            }
            if !accepted.iter().any(|t| t == trimmed) {
                accepted.push(trimmed.to_string());
            }
        }
        Ok(Self { tokens: accepted })
    }

    pub fn is_enabled(&self) -> bool {
        !self.tokens.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Compare against every configured token without short-circuiting.
    fn accepts(&self, provided: &str) -> bool {
        self.tokens.iter().fold(false, |found, expected| {
            let same_len = provided.len() == expected.len();
            found | (same_len && bool::from(provided.as_bytes().ct_eq(expected.as_bytes())))
        })
    }
}

/// Reject requests that lack a valid `Authorization: Bearer <token>` header.
pub async fn auth_middleware(
    State(auth): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Ok(token) => token,
        Err(msg) => {
            warn!(reason = msg, "Authentication failed");
            return unauthorized(msg);
        }
    };

    if auth.accepts(token) {
        next.run(request).await
    } else {
        warn!(token_prefix = %mask_token(token), "Authentication failed: invalid token");
        unauthorized("Invalid Bearer token")
    }
}

fn bearer_token(request: &Request<Body>) -> Result<&str, &'static str> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or("Missing Bearer token in Authorization header")?
        .to_str()
        .map_err(|_| "Authorization header contains invalid characters")?;

    let token = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or("Invalid Authorization header format. Expected 'Bearer <token>'")?
        .trim();
    if token.is_empty() {
        return Err("Bearer token is empty");
    }
    Ok(token)
}

/// First three characters, for log lines.
fn mask_token(token: &str) -> String {
    if token.chars().count() <= 3 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(3).collect();
    format!("{}***", prefix)
}

fn unauthorized(message: &str) -> Response {
    #[derive(Serialize)]
    struct ErrorBody<'a> {
        code: &'static str,
        message: &'a str,
    }

    let body = serde_json::json!({
        "error": ErrorBody {
            code: "unauthorized",
            message,
        }
    });
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        axum::Json(body),
    )
        .into_response()
}
