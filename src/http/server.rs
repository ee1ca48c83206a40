//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener
//! - Dispatch proxy route traffic to the forwarding engine
//! - Serve `/health` and the JSON 404 fallback

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{GatewayConfig, ProxyMode};
use crate::http::request::InboundRequest;
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::proxy::Forwarder;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub forwarder: Arc<Forwarder>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: Arc<GatewayConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let forwarder = Arc::new(Forwarder::new(&config));
        let config = Arc::new(config);

        let state = AppState {
            config: config.clone(),
            forwarder,
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let prefix = state.forwarder.route().prefix().to_string();
        tracing::debug!(prefix = %prefix, mode = config.proxy.mode.as_str(), "Building router");

        Router::new()
            .route("/health", get(health_handler))
            .route(&prefix, any(proxy_handler))
            .route(&format!("{}/", prefix), any(proxy_handler))
            .route(&format!("{}/{{*rest}}", prefix), any(proxy_handler))
            .fallback(not_found_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The router, for serving in-process without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `stop` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        stop: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            target = %self.config.upstream.target_origin,
            prefix = %self.config.proxy.route_prefix,
            mode = self.config.proxy.mode.as_str(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown::signalled(stop).await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Proxy route handler: buffer, verify, forward, relay.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let response = match InboundRequest::from_request(
        request,
        client_addr,
        state.config.security.max_body_size,
    )
    .await
    {
        Ok(inbound) => state.forwarder.handle(inbound).await,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read inbound request");
            state.forwarder.strategy().render_error(&e)
        }
    };

    metrics::record_request(&method, response.status().as_u16(), start_time);
    response
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let config = &state.config;
    let body = match config.proxy.mode {
        ProxyMode::HtmlRewrite => json!({
            "status": "ok",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "config": {
                "targetDomain": config.upstream.target_origin,
                "proxyPath": config.proxy.route_prefix,
            },
        }),
        ProxyMode::Liquid => json!({
            "status": "ok",
            "target": config.upstream.target_origin,
            "proxyPath": config.proxy.route_prefix,
        }),
    };
    Json(body)
}

async fn not_found_handler(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found", "path": uri.path() })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    async fn call(router: Router, uri: &str) -> (StatusCode, serde_json::Value, Option<String>) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap(), request_id)
    }

    #[tokio::test]
    async fn test_health_rewrite_mode() {
        let server = HttpServer::new(GatewayConfig::default());
        let (status, body, request_id) = call(server.router(), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].is_string());
        assert_eq!(body["config"]["targetDomain"], "http://localhost:3001");
        assert_eq!(body["config"]["proxyPath"], "/proxy");
        assert!(request_id.is_some());
    }

    #[tokio::test]
    async fn test_health_liquid_mode() {
        let mut config = GatewayConfig::default();
        config.proxy.mode = ProxyMode::Liquid;
        let server = HttpServer::new(config);
        let (_, body, _) = call(server.router(), "/health").await;

        assert_eq!(body["target"], "http://localhost:3001");
        assert_eq!(body["proxyPath"], "/proxy");
        assert!(body.get("config").is_none());
    }

    #[tokio::test]
    async fn test_unmatched_route() {
        let server = HttpServer::new(GatewayConfig::default());
        let (status, body, _) = call(server.router(), "/elsewhere/page").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found");
        assert_eq!(body["path"], "/elsewhere/page");
    }

    #[tokio::test]
    async fn test_prefix_lookalike_is_not_proxied() {
        let server = HttpServer::new(GatewayConfig::default());
        let (status, _, _) = call(server.router(), "/proxyfoo").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
