//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay the upstream status, filtered headers and body to the client
//! - Map pipeline errors to the fixed failure responses
//!
//! # Design Decisions
//! - Bodies are buffered; content-length is recomputed by the server
//! - Every failure is a 401 or a 500, never a dropped connection
//! - JSON bodies for machines, an inline fragment when the storefront renders the page

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::GatewayError;

/// Content type the storefront renders as template markup.
pub const LIQUID_CONTENT_TYPE: &str = "application/liquid";

/// Response relayed to the original caller.
#[derive(Debug, Clone)]
pub struct OutboundResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl OutboundResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

impl IntoResponse for OutboundResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

/// Structured JSON failure response.
pub fn json_error(err: &GatewayError) -> Response {
    let body = match err {
        GatewayError::InvalidSignature => ErrorBody {
            error: "Unauthorized",
            message: "Invalid signature".to_string(),
            hint: None,
        },
        other => ErrorBody {
            error: "Proxy error",
            message: other.to_string(),
            hint: other.hint(),
        },
    };
    (err.status(), Json(body)).into_response()
}

/// Inline fragment failure response, tagged so the storefront renders it in place.
pub fn liquid_error(err: &GatewayError) -> Response {
    let message = match err {
        GatewayError::InvalidSignature => "This page could not be verified.",
        _ => "We couldn't load this page right now. Please try again in a moment.",
    };
    let fragment = format!(
        concat!(
            "<div style=\"padding:40px 20px;text-align:center;font-family:inherit;\">",
            "<h2 style=\"margin-bottom:12px;\">Something went wrong</h2>",
            "<p style=\"color:#6d7175;\">{}</p>",
            "</div>"
        ),
        message
    );

    let mut response = (err.status(), fragment).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(LIQUID_CONTENT_TYPE),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_json_signature_error() {
        let response = json_error(&GatewayError::InvalidSignature);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Unauthorized");
        assert!(body.get("hint").is_none());
    }

    #[tokio::test]
    async fn test_json_refused_error_has_hint() {
        let err = GatewayError::from(UpstreamError::ConnectionRefused("http://localhost:3001".into()));
        let response = json_error(&err);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Proxy error");
        assert!(body["hint"].as_str().unwrap().contains("localhost:3001"));
    }

    #[tokio::test]
    async fn test_liquid_error_fragment() {
        let response = liquid_error(&GatewayError::Upstream(UpstreamError::Timeout(30)));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CONTENT_TYPE], LIQUID_CONTENT_TYPE);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("<div"));
        assert!(text.contains("Something went wrong"));
    }

    #[test]
    fn test_outbound_into_response() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let outbound = OutboundResponse {
            status: StatusCode::NOT_FOUND,
            headers,
            body: Bytes::from_static(b"missing"),
        };
        assert_eq!(outbound.content_type(), Some("text/plain"));

        let response = outbound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    }
}
