//! HTTP server for meshd

use crate::config::Config;
use crate::logging::DebugLog;
use crate::middleware::body_size_limit;
use crate::routes;
use crate::supabase::{SupabaseClient, UpstreamError};
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub supabase: SupabaseClient,
    pub debug_log: DebugLog,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config, debug_log: DebugLog) -> Result<Self, UpstreamError> {
        let supabase = SupabaseClient::new(&config.supabase)?;
        Ok(Self {
            config,
            supabase,
            debug_log,
            start_time: Instant::now(),
        })
    }
}

/// CORS policy: a fixed origin when configured, otherwise the caller's
/// origin is echoed back. Credentials are allowed either way.
pub fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let origin = match allowed_origin {
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                AllowOrigin::mirror_request()
            }
        },
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let max_body = state.config.server.max_body_bytes;
    let cors = cors_layer(state.config.server.cors_allowed_origin.as_deref());
    let state = Arc::new(state);

    Router::new()
        .merge(routes::auth_routes())
        .merge(routes::device_routes())
        .merge(routes::health_routes())
        .layer(axum::middleware::from_fn_with_state(max_body, body_size_limit))
        .layer(DefaultBodyLimit::max(max_body))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until Ctrl-C
pub async fn run(state: AppState) -> Result<()> {
    let addr = state.config.server.bind.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down gracefully");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state(origin: Option<&str>) -> AppState {
        let mut config = Config::default();
        config.supabase.url = "http://127.0.0.1:1".into();
        config.server.cors_allowed_origin = origin.map(str::to_string);
        AppState::new(config, DebugLog::disabled()).unwrap()
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method("OPTIONS")
            .uri("/v1/devices")
            .header("origin", origin)
            .header("access-control-request-method", "DELETE")
            .header("access-control-request-headers", "authorization,content-type")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_preflight_mirrors_origin() {
        let resp = router(state(None))
            .oneshot(preflight("https://painel.example.pt"))
            .await
            .unwrap();
        assert!(resp.status().is_success());
        let headers = resp.headers();
        assert_eq!(
            headers["access-control-allow-origin"],
            "https://painel.example.pt"
        );
        assert_eq!(headers["access-control-allow-credentials"], "true");
        let methods = headers["access-control-allow-methods"].to_str().unwrap();
        assert!(methods.contains("DELETE"));
    }

    #[tokio::test]
    async fn test_preflight_fixed_origin() {
        let resp = router(state(Some("https://suporte.example.pt")))
            .oneshot(preflight("https://other.example.com"))
            .await
            .unwrap();
        assert_eq!(
            resp.headers()["access-control-allow-origin"],
            "https://suporte.example.pt"
        );
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let req = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let resp = router(state(None)).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
