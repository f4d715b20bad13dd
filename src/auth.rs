//! Authentication and rate limiting (part of C7).
//!
//! Authentication is HTTP Basic with the API key as username and an empty password;
//! invalid or missing credentials yield `Unauthorized` (mapped to 401 with
//! `WWW-Authenticate: Basic` by `error.rs`). Rate limiting is a token bucket per endpoint
//! family, keyed on the caller's credentials, backed by `governor` — the same crate already
//! proven out elsewhere in the workspace for in-memory token buckets.

use crate::error::CursorSimError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

pub type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Token buckets for the three rate-limit tiers spec §4.7 defines. Each endpoint family is
/// wired to exactly one of these via middleware layering in `routes/`.
pub struct RateLimiters {
    pub admin: Arc<KeyedLimiter>,
    pub ai_code: Arc<KeyedLimiter>,
    pub team_analytics: Arc<KeyedLimiter>,
    pub by_user: Arc<KeyedLimiter>,
}

impl RateLimiters {
    pub fn new() -> Self {
        Self {
            admin: Arc::new(RateLimiter::keyed(per_minute(20))),
            ai_code: Arc::new(RateLimiter::keyed(per_minute(20))),
            team_analytics: Arc::new(RateLimiter::keyed(per_minute(100))),
            by_user: Arc::new(RateLimiter::keyed(per_minute(50))),
        }
    }
}

impl Default for RateLimiters {
    fn default() -> Self {
        Self::new()
    }
}

fn per_minute(n: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(n).expect("rate limit must be nonzero"))
}

/// Decodes `Authorization: Basic base64(username:password)`; returns `(username, password)`.
fn decode_basic_credentials(header_value: &str) -> Option<(String, String)> {
    let encoded = header_value.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD.decode(encoded).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (user, pass) = text.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Validates the `Authorization` header against the configured API key. Username must equal
/// the key; password must be empty, per spec §4.7/§6.
pub fn validate_credentials(header: Option<&str>, expected_api_key: &str) -> Result<String, CursorSimError> {
    let header = header.ok_or_else(|| CursorSimError::Unauthorized("Invalid API key".into()))?;
    let (username, password) =
        decode_basic_credentials(header).ok_or_else(|| CursorSimError::Unauthorized("Invalid API key".into()))?;

    if username != expected_api_key || !password.is_empty() {
        return Err(CursorSimError::Unauthorized("Invalid API key".into()));
    }

    Ok(username)
}

/// Applied to every route except `/health`. Extracts and validates credentials, then stashes
/// the caller's key in request extensions so downstream rate-limit layers can use it.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, CursorSimError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let key = validate_credentials(header, &state.config.api_key)?;
    req.extensions_mut().insert(CallerKey(key));
    Ok(next.run(req).await)
}

#[derive(Debug, Clone)]
pub struct CallerKey(pub String);

async fn rate_limit(limiter: &KeyedLimiter, key: &str) -> Result<(), CursorSimError> {
    limiter
        .check_key(&key.to_string())
        .map_err(|_| CursorSimError::RateLimited("token bucket empty".into()))
}

pub async fn rate_limit_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, CursorSimError> {
    rate_limited_pass(&state.rate_limiters.admin, req, next).await
}

pub async fn rate_limit_ai_code(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, CursorSimError> {
    rate_limited_pass(&state.rate_limiters.ai_code, req, next).await
}

pub async fn rate_limit_team_analytics(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, CursorSimError> {
    rate_limited_pass(&state.rate_limiters.team_analytics, req, next).await
}

pub async fn rate_limit_by_user(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, CursorSimError> {
    rate_limited_pass(&state.rate_limiters.by_user, req, next).await
}

async fn rate_limited_pass(limiter: &KeyedLimiter, req: Request, next: Next) -> Result<Response, CursorSimError> {
    let key = req
        .extensions()
        .get::<CallerKey>()
        .map(|k| k.0.clone())
        .unwrap_or_else(|| "anonymous".to_string());
    rate_limit(limiter, &key).await?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_key_with_empty_password() {
        let header = format!("Basic {}", base64::engine::general_purpose::STANDARD.encode("secret:"));
        assert!(validate_credentials(Some(&header), "secret").is_ok());
    }

    #[test]
    fn rejects_wrong_key() {
        let header = format!("Basic {}", base64::engine::general_purpose::STANDARD.encode("wrong:"));
        assert!(validate_credentials(Some(&header), "secret").is_err());
    }

    #[test]
    fn rejects_nonempty_password() {
        let header = format!("Basic {}", base64::engine::general_purpose::STANDARD.encode("secret:pw"));
        assert!(validate_credentials(Some(&header), "secret").is_err());
    }

    #[test]
    fn rejects_missing_header() {
        assert!(validate_credentials(None, "secret").is_err());
    }

    #[tokio::test]
    async fn rate_limiter_allows_then_blocks() {
        let limiter = RateLimiters::new();
        for _ in 0..20 {
            assert!(rate_limit(&limiter.admin, "key-a").await.is_ok());
        }
        assert!(rate_limit(&limiter.admin, "key-a").await.is_err());
    }

    #[tokio::test]
    async fn rate_limiter_keys_are_independent() {
        let limiter = RateLimiters::new();
        for _ in 0..20 {
            assert!(rate_limit(&limiter.admin, "key-a").await.is_ok());
        }
        assert!(rate_limit(&limiter.admin, "key-b").await.is_ok());
    }
}
