//! Error definitions for the request pipeline.

use std::error::Error as StdError;
use thiserror::Error;

/// Transport-level failure talking to the upstream.
///
/// An upstream that answers with any status code is a successful exchange and
/// never produces one of these.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// No complete response within the configured deadline.
    #[error("upstream timed out after {0} seconds")]
    Timeout(u64),

    /// The upstream host actively refused the connection.
    #[error("connection refused by {0}")]
    ConnectionRefused(String),

    /// Connection could not be established (DNS, TLS, unreachable).
    #[error("failed to connect to upstream: {0}")]
    Connect(String),

    /// Any other error while sending the request.
    #[error("upstream request failed: {0}")]
    Request(String),

    /// The response head arrived but the body could not be read.
    #[error("failed to read upstream body: {0}")]
    Body(String),
}

impl UpstreamError {
    /// Classify a failed exchange on the upstream client.
    pub fn from_client(err: &hyper_util::client::legacy::Error, target: &str) -> Self {
        if err.is_connect() {
            if is_connection_refused(err) {
                return UpstreamError::ConnectionRefused(target.to_string());
            }
            return UpstreamError::Connect(error_chain(err));
        }
        UpstreamError::Request(error_chain(err))
    }

    /// Label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Timeout(_) => "timeout",
            UpstreamError::ConnectionRefused(_) => "connection_refused",
            UpstreamError::Connect(_) => "connect",
            UpstreamError::Request(_) => "request",
            UpstreamError::Body(_) => "body",
        }
    }
}

fn is_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(inner) = source {
        if let Some(io) = inner.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        source = inner.source();
    }
    false
}

/// `outer: cause: root cause`, since the client's own message is terse.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

/// Errors that end a proxied request early.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or mismatching request signature.
    #[error("invalid signature")]
    InvalidSignature,

    /// The upstream could not be reached or did not answer in time.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The forwarding URL could not be built.
    #[error("invalid upstream url: {0}")]
    InvalidTarget(#[from] axum::http::uri::InvalidUri),

    /// The inbound body could not be buffered.
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// Anything else that went wrong while transforming the exchange.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> axum::http::StatusCode {
        match self {
            GatewayError::InvalidSignature => axum::http::StatusCode::UNAUTHORIZED,
            _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Operator hint shown alongside the error, if there is a useful one.
    pub fn hint(&self) -> Option<String> {
        match self {
            GatewayError::Upstream(UpstreamError::ConnectionRefused(target)) => Some(format!(
                "Make sure the target application is running at {}",
                target
            )),
            _ => None,
        }
    }
}

/// Result type for the request pipeline.
pub type GatewayResult<T> = Result<T, GatewayError>;
