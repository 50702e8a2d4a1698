//! API key authentication middleware

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;

use super::ApiState;

/// Extract API key from Authorization header
fn extract_api_key(req: &Request) -> Option<&str> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Middleware to verify the Bearer token on function routes
///
/// # Errors
///
/// Returns `401 Unauthorized` when a key is configured and the request
/// carries no key or a different one
pub async fn require_api_key(
    State(state): State<ApiState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // No key configured: the API is open (local development)
    let Some(expected_key) = &state.api_key else {
        return Ok(next.run(req).await);
    };

    match extract_api_key(&req) {
        Some(key) if key == expected_key.expose_secret() => Ok(next.run(req).await),
        Some(_) => {
            tracing::warn!(path = %req.uri().path(), "invalid API key provided");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::debug!(path = %req.uri().path(), "no API key provided");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn extracts_bearer_token() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(extract_api_key(&req), None);

        req.headers_mut().insert(
            "authorization",
            HeaderValue::from_static("Bearer test-key-123"),
        );
        assert_eq!(extract_api_key(&req), Some("test-key-123"));
    }

    #[test]
    fn ignores_other_schemes() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        req.headers_mut()
            .insert("authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(extract_api_key(&req), None);
    }
}
