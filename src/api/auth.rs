//! API key check for the write routes
//!
//! When `ApiConfig::api_key` is set, admin requests must carry a matching
//! `X-Api-Key` header or they receive 401 with an `unauthorized` error body.
//! Public reads and the delivery endpoint never pass through here.

use crate::error::ApiError;
use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Header carrying the key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Why a request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No `X-Api-Key` header (or not valid UTF-8)
    Missing,
    /// Header present but does not match
    Invalid,
}

impl AuthFailure {
    fn message(&self) -> &'static str {
        match self {
            AuthFailure::Missing => "Missing X-Api-Key header",
            AuthFailure::Invalid => "Invalid API key",
        }
    }
}

/// Compare the request's key with the expected one
///
/// Keys are compared exactly: case-sensitive, no trimming.
pub fn check_api_key(headers: &HeaderMap, expected: &str) -> Result<(), AuthFailure> {
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthFailure::Missing)?;

    if constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(AuthFailure::Invalid)
    }
}

/// Middleware rejecting requests without a valid API key
///
/// With `None` configured every request passes.
///
/// ```no_run
/// use axum::{Router, middleware, routing::post};
/// use downloads_catalog::api::auth::require_api_key;
///
/// let api_key = Some("secret-key-123".to_string());
/// let router: Router = Router::new()
///     .route("/admin", post(|| async { "ok" }))
///     .route_layer(middleware::from_fn_with_state(api_key, require_api_key));
/// ```
pub async fn require_api_key(
    State(expected_api_key): State<Option<String>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected_key) = expected_api_key else {
        return next.run(request).await;
    };

    match check_api_key(request.headers(), &expected_key) {
        Ok(()) => next.run(request).await,
        Err(failure) => {
            tracing::debug!(
                path = %request.uri().path(),
                reason = failure.message(),
                "Rejected admin request"
            );
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiError::unauthorized(failure.message())),
            )
                .into_response()
        }
    }
}

/// Compares all bytes regardless of where the first mismatch occurs
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
