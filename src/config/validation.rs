//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the target origin and route paths
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;
use url::Url;

use crate::config::schema::GatewayConfig;
use crate::routing::is_plain_path;

/// Upper bound on the upstream timeout.
const MAX_TIMEOUT_SECS: u64 = 300;

/// Upper bound on followed redirects.
const MAX_REDIRECTS: usize = 20;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    match Url::parse(&config.upstream.target_origin) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                errors.push(ValidationError::new(
                    "upstream.target_origin",
                    format!("unsupported scheme '{}'", url.scheme()),
                ));
            }
            if url.host_str().is_none() {
                errors.push(ValidationError::new("upstream.target_origin", "missing host"));
            }
        }
        Err(e) => errors.push(ValidationError::new(
            "upstream.target_origin",
            format!("'{}' is not a valid URL: {}", config.upstream.target_origin, e),
        )),
    }

    if config.upstream.timeout_secs == 0 || config.upstream.timeout_secs > MAX_TIMEOUT_SECS {
        errors.push(ValidationError::new(
            "upstream.timeout_secs",
            format!("must be between 1 and {}", MAX_TIMEOUT_SECS),
        ));
    }

    if config.upstream.max_redirects > MAX_REDIRECTS {
        errors.push(ValidationError::new(
            "upstream.max_redirects",
            format!("must be at most {}", MAX_REDIRECTS),
        ));
    }

    check_path(&mut errors, "proxy.route_prefix", &config.proxy.route_prefix);
    if config.proxy.route_prefix == "/" {
        errors.push(ValidationError::new("proxy.route_prefix", "must not be the root path"));
    }
    check_path(&mut errors, "proxy.external_path", &config.proxy.external_path);

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_path(errors: &mut Vec<ValidationError>, field: &'static str, path: &str) {
    if !path.starts_with('/') {
        errors.push(ValidationError::new(field, format!("'{}' must start with '/'", path)));
    } else if path.len() > 1 && path.ends_with('/') {
        errors.push(ValidationError::new(field, format!("'{}' must not end with '/'", path)));
    } else if !is_plain_path(path) {
        errors.push(ValidationError::new(
            field,
            format!("'{}' contains whitespace, quotes or angle brackets", path),
        ));
    }
}
