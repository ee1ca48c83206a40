//! Forwarding engine.
//!
//! # Responsibilities
//! - Gate requests on the app proxy signature (production only)
//! - Build the upstream URI and header set
//! - Issue the single upstream call and relay its response
//! - Apply the configured response strategy
//!
//! # Design Decisions
//! - Every HTTP status from the upstream is data, relayed verbatim
//! - Transport failures (timeout, refused, DNS) are `UpstreamError`s
//! - No retries: one request in, at most one upstream exchange out
//! - The upstream path is sent as received, dot segments included
//! - A request's `path_prefix` only reaches the HTML or headers once its
//!   signature has been verified

use std::fmt;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::decompression::{Decompression, DecompressionLayer};
use tower_http::follow_redirect::{policy::Limited, FollowRedirect, FollowRedirectLayer};

use crate::config::{GatewayConfig, ProxySettings};
use crate::error::{GatewayError, GatewayResult, UpstreamError};
use crate::http::request::InboundRequest;
use crate::http::response::OutboundResponse;
use crate::observability::metrics;
use crate::proxy::rewrite::{strategy_for, ResponseStrategy};
use crate::routing::{is_plain_path, ForwardingTarget, PathPrefixMatcher, ProxyParameters};
use crate::security::headers::{filter_response_headers, upstream_headers, HeaderOptions};
use crate::security::signature;

/// hyper client that follows redirects and decodes compressed bodies.
type UpstreamClient =
    Decompression<FollowRedirect<Client<HttpsConnector<HttpConnector>, Body>, Limited>>;

/// Raw upstream exchange, whatever its status.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Forwards app proxy requests to the single configured upstream.
pub struct Forwarder {
    client: UpstreamClient,
    origin: String,
    route: PathPrefixMatcher,
    settings: ProxySettings,
    timeout: Duration,
    secret: Option<String>,
    enforce_signature: bool,
    strategy: Box<dyn ResponseStrategy>,
}

impl fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Forwarder")
            .field("origin", &self.origin)
            .field("route", &self.route)
            .field("timeout", &self.timeout)
            .field("enforce_signature", &self.enforce_signature)
            .field("strategy", &self.strategy.name())
            .finish_non_exhaustive()
    }
}

impl Forwarder {
    /// Create a forwarder from a validated configuration.
    pub fn new(config: &GatewayConfig) -> Self {
        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();
        let client = ServiceBuilder::new()
            .layer(DecompressionLayer::new())
            .layer(FollowRedirectLayer::with_policy(Limited::new(
                config.upstream.max_redirects,
            )))
            .service(Client::builder(TokioExecutor::new()).build(connector));

        Self {
            client,
            origin: config.upstream.target_origin.trim_end_matches('/').to_string(),
            route: PathPrefixMatcher::new(config.proxy.route_prefix.clone()),
            settings: config.proxy.clone(),
            timeout: Duration::from_secs(config.upstream.timeout_secs),
            secret: config.security.secret().map(str::to_string),
            enforce_signature: config.security.enforce_signature(),
            strategy: strategy_for(config.proxy.mode),
        }
    }

    pub fn strategy(&self) -> &dyn ResponseStrategy {
        self.strategy.as_ref()
    }

    pub fn route(&self) -> &PathPrefixMatcher {
        &self.route
    }

    /// Storefront mount path.
    ///
    /// The request's `path_prefix` wins only when its signature was verified
    /// and it is a plain path; otherwise the configured external path is used.
    pub fn external_path(&self, params: &ProxyParameters, verified: bool) -> String {
        params
            .path_prefix
            .as_deref()
            .filter(|p| verified && is_plain_path(p))
            .unwrap_or(self.settings.external_path.as_str())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn target(&self, req: &InboundRequest) -> ForwardingTarget {
        ForwardingTarget::new(
            &self.origin,
            &self.route,
            &req.path,
            &req.query,
            self.settings.query_policy(),
        )
    }

    /// Signature gate. Skipped outside production.
    ///
    /// Returns whether a signature was actually checked against a secret.
    pub fn authorize(&self, req: &InboundRequest) -> GatewayResult<bool> {
        if !self.enforce_signature {
            return Ok(false);
        }
        if signature::verify(&req.query, self.secret.as_deref()) {
            Ok(self.secret.is_some())
        } else {
            metrics::record_signature_failure();
            tracing::warn!(
                request_id = %req.request_id(),
                path = %req.path,
                "Rejected request with invalid signature"
            );
            Err(GatewayError::InvalidSignature)
        }
    }

    /// Run the full pipeline, converting every failure into the fixed failure response.
    pub async fn handle(&self, req: InboundRequest) -> Response {
        let result = match self.authorize(&req) {
            Ok(verified) => self.forward(&req, verified).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(outbound) => outbound.into_response(),
            Err(err) => {
                if let GatewayError::Upstream(upstream) = &err {
                    metrics::record_upstream_error(upstream.kind());
                    tracing::error!(
                        request_id = %req.request_id(),
                        target = %self.origin,
                        error = %upstream,
                        "Upstream request failed"
                    );
                } else if !matches!(err, GatewayError::InvalidSignature) {
                    tracing::error!(request_id = %req.request_id(), error = %err, "Proxy error");
                }
                self.strategy.render_error(&err)
            }
        }
    }

    /// Forward `req` and transform the upstream response.
    pub async fn forward(
        &self,
        req: &InboundRequest,
        verified: bool,
    ) -> GatewayResult<OutboundResponse> {
        let params = ProxyParameters::extract(&req.query);
        let uri = self.target(req).uri()?;
        let external_path = self.external_path(&params, verified);

        let options = HeaderOptions {
            forward_client_info: self.settings.forward_client_info(),
            proxy_path: self
                .settings
                .expose_proxy_path()
                .then(|| external_path.clone()),
        };
        let headers = upstream_headers(req, &params, &options);

        tracing::debug!(
            request_id = %req.request_id(),
            method = %req.method,
            upstream = %uri,
            shop = params.shop.as_deref().unwrap_or(""),
            "Forwarding request"
        );

        let upstream = self.send(req.method.clone(), uri, headers, req.body.clone()).await?;

        let mut outbound = OutboundResponse {
            status: upstream.status,
            headers: filter_response_headers(&upstream.headers),
            body: upstream.body,
        };
        if self.strategy.apply(&mut outbound, &external_path) {
            metrics::record_body_rewrite(self.strategy.name());
        }

        tracing::debug!(
            request_id = %req.request_id(),
            status = %outbound.status,
            bytes = outbound.body.len(),
            "Relaying upstream response"
        );
        Ok(outbound)
    }

    /// One upstream exchange, bounded by the configured timeout from the first
    /// byte sent to the last body byte read. Any status code is a successful
    /// exchange.
    pub async fn send(
        &self,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<UpstreamResponse, UpstreamError> {
        match tokio::time::timeout(self.timeout, self.exchange(method, uri, headers, body)).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout(self.timeout.as_secs())),
        }
    }

    async fn exchange(
        &self,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let body = if body.is_empty() { Body::empty() } else { Body::from(body) };
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .map_err(|e| UpstreamError::Request(e.to_string()))?;
        *request.headers_mut() = headers;

        let response = self
            .client
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| UpstreamError::from_client(&e, &self.origin))?;

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), usize::MAX)
            .await
            .map_err(|e| UpstreamError::Body(e.to_string()))?;

        Ok(UpstreamResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}
