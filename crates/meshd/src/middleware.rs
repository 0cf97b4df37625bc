//! Request middleware and request metadata helpers.

use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::warn;

/// Body size limit middleware
///
/// Checks the Content-Length header against the configured maximum.
pub async fn body_size_limit(
    State(max_bytes): State<usize>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(length) = content_length(request.headers()) {
        if length > max_bytes {
            warn!("Request body too large: {} bytes (max: {})", length, max_bytes);
            return Err(ApiError::PayloadTooLarge);
        }
    }

    Ok(next.run(request).await)
}

fn content_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get("content-length")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Best-effort client address for logging
///
/// Takes the first entry of X-Forwarded-For, then X-Real-IP.
pub fn client_ip(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    fn app(max: usize) -> Router {
        Router::new()
            .route("/echo", post(|body: String| async move { body }))
            .layer(axum::middleware::from_fn_with_state(max, body_size_limit))
    }

    #[tokio::test]
    async fn test_body_within_limit() {
        let req = HttpRequest::builder()
            .method("POST")
            .uri("/echo")
            .header("content-length", "5")
            .body(Body::from("hello"))
            .unwrap();
        let resp = app(16).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_body_over_limit() {
        let body = "x".repeat(32);
        let req = HttpRequest::builder()
            .method("POST")
            .uri("/echo")
            .header("content-length", body.len().to_string())
            .body(Body::from(body))
            .unwrap();
        let resp = app(16).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_client_ip() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), "unknown");

        headers.insert("x-real-ip", "10.0.0.9".parse().unwrap());
        assert_eq!(client_ip(&headers), "10.0.0.9");

        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }
}
