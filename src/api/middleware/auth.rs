//! Bearer token guard for the REST routes
//!
//! Only `/api/v1` is wrapped. The observer stream at `/ws` is reachable
//! without a token.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};

/// Configured API token, shared by every guarded request
#[derive(Clone)]
pub struct ApiToken(Arc<str>);

impl ApiToken {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    /// Compare without short-circuiting on the first differing byte
    pub fn matches(&self, candidate: &str) -> bool {
        let expected = self.0.as_bytes();
        let candidate = candidate.as_bytes();
        if expected.len() != candidate.len() {
            return false;
        }
        expected
            .iter()
            .zip(candidate)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

/// Extract the credential of an `Authorization: Bearer <token>` header
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> ApiResult<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Authorization header is not ASCII".to_string()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(ApiError::Unauthorized(
            "expected Authorization: Bearer <token>".to_string(),
        )),
    }
}

/// Reject requests whose bearer token does not match the configured one
///
/// Missing or malformed credentials answer 401, a wrong token answers 403.
pub async fn require_api_token(
    State(token): State<ApiToken>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let presented = bearer_token(request.headers())?;

    if !token.matches(presented) {
        debug!("rejected {} {} with a wrong token", request.method(), request.uri().path());
        return Err(ApiError::Forbidden("invalid API token".to_string()));
    }

    Ok(next.run(request).await)
}
