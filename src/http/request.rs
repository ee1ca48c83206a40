//! Request handling and transformation.
//!
//! # Responsibilities
//! - Buffer the inbound request into an owned, request-scoped value
//! - Parse the query once and keep the client address and protocol
//! - Carry the request ID assigned by the request-id layer
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The body is buffered once so it can be forwarded verbatim

use std::net::SocketAddr;

use axum::body::{Body, Bytes};
use axum::http::{header, request::Parts, HeaderMap, HeaderValue, Method, Request};

use crate::error::{GatewayError, GatewayResult};
use crate::routing::query::QueryParams;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// An inbound request, fully buffered.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub path: String,
    pub query: QueryParams,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub client_addr: Option<SocketAddr>,
    /// `http` or `https` as seen by the client.
    pub protocol: String,
}

impl InboundRequest {
    /// Buffer `request`, reading at most `max_body_size` bytes of body.
    pub async fn from_request(
        request: Request<Body>,
        client_addr: Option<SocketAddr>,
        max_body_size: usize,
    ) -> GatewayResult<Self> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, max_body_size)
            .await
            .map_err(|e| GatewayError::BodyRead(e.to_string()))?;
        Ok(Self::from_parts(parts, body, client_addr))
    }

    pub fn from_parts(parts: Parts, body: Bytes, client_addr: Option<SocketAddr>) -> Self {
        let protocol = parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| v == "http" || v == "https")
            .or_else(|| parts.uri.scheme_str().map(str::to_string))
            .unwrap_or_else(|| "http".to_string());

        Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query: QueryParams::parse(parts.uri.query()),
            headers: parts.headers,
            body,
            client_addr,
            protocol,
        }
    }

    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    pub fn header_str(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn request_id(&self) -> &str {
        self.header_str(X_REQUEST_ID).unwrap_or("unknown")
    }

    /// Host the client addressed.
    pub fn host(&self) -> Option<&str> {
        self.header_str(header::HOST)
    }
}
