//! Header manipulation.
//!
//! # Responsibilities
//! - Build a fresh outbound header set for the upstream
//! - Add X-Forwarded-For, X-Forwarded-Proto, X-Forwarded-Host (when enabled)
//! - Expose shop and customer identity as stable custom headers
//! - Strip transport framing headers from upstream responses
//!
//! # Design Decisions
//! - Inbound headers are never copied wholesale; only an allow-list survives
//! - Identity headers are always present, empty when unknown
//! - Header values that cannot be represented are sent empty, never dropped

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};

use crate::http::request::{InboundRequest, X_REQUEST_ID};
use crate::routing::query::ProxyParameters;

pub const X_SHOPIFY_SHOP: &str = "x-shopify-shop";
pub const X_SHOPIFY_CUSTOMER_ID: &str = "x-shopify-customer-id";
pub const X_SHOPIFY_PROXY_PATH: &str = "x-shopify-proxy-path";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

pub const DEFAULT_ACCEPT: &str = "*/*";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
pub const DEFAULT_USER_AGENT: &str = concat!("app-proxy-gateway/", env!("CARGO_PKG_VERSION"));

/// Upstream response headers that describe the upstream hop only.
const STRIPPED_RESPONSE_HEADERS: &[HeaderName] = &[
    // Bodies are decoded by the upstream client before they get here.
    header::CONTENT_ENCODING,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
    // The body is buffered and possibly rewritten; the server recomputes it.
    header::CONTENT_LENGTH,
];

/// Which optional header groups are sent upstream.
#[derive(Debug, Clone, Default)]
pub struct HeaderOptions {
    /// Send `x-forwarded-for`, `x-forwarded-proto`, `x-forwarded-host`.
    pub forward_client_info: bool,
    /// Send `x-shopify-proxy-path` with this value.
    pub proxy_path: Option<String>,
}

/// Methods whose `content-type` is forwarded.
pub fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

/// Build the header set sent to the upstream.
pub fn upstream_headers(
    req: &InboundRequest,
    params: &ProxyParameters,
    options: &HeaderOptions,
) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(
        header::ACCEPT,
        inbound_or(req, header::ACCEPT, DEFAULT_ACCEPT),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        inbound_or(req, header::ACCEPT_LANGUAGE, DEFAULT_ACCEPT_LANGUAGE),
    );
    headers.insert(
        header::USER_AGENT,
        inbound_or(req, header::USER_AGENT, DEFAULT_USER_AGENT),
    );

    headers.insert(
        HeaderName::from_static(X_SHOPIFY_SHOP),
        value_or_empty(params.shop.as_deref()),
    );
    headers.insert(
        HeaderName::from_static(X_SHOPIFY_CUSTOMER_ID),
        value_or_empty(params.logged_in_customer_id.as_deref()),
    );

    if carries_body(&req.method) {
        if let Some(ct) = req.header(header::CONTENT_TYPE) {
            headers.insert(header::CONTENT_TYPE, ct.clone());
        }
    }

    if let Some(id) = req.header(X_REQUEST_ID) {
        headers.insert(HeaderName::from_static(X_REQUEST_ID), id.clone());
    }

    if options.forward_client_info {
        let client_ip = req.client_addr.map(|a| a.ip().to_string());
        headers.insert(
            HeaderName::from_static(X_FORWARDED_FOR),
            value_or_empty(client_ip.as_deref()),
        );
        headers.insert(
            HeaderName::from_static(X_FORWARDED_PROTO),
            value_or_empty(Some(req.protocol.as_str())),
        );
        headers.insert(
            HeaderName::from_static(X_FORWARDED_HOST),
            value_or_empty(req.host()),
        );
    }

    if let Some(path) = &options.proxy_path {
        headers.insert(
            HeaderName::from_static(X_SHOPIFY_PROXY_PATH),
            value_or_empty(Some(path.as_str())),
        );
    }

    headers
}

/// Copy of `upstream` without hop-specific framing headers.
pub fn filter_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream.iter() {
        if STRIPPED_RESPONSE_HEADERS.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

fn inbound_or(req: &InboundRequest, name: HeaderName, default: &'static str) -> HeaderValue {
    req.header(&name)
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(default))
}

fn value_or_empty(value: Option<&str>) -> HeaderValue {
    value
        .and_then(|v| HeaderValue::from_str(v).ok())
        .unwrap_or_else(|| HeaderValue::from_static(""))
}
