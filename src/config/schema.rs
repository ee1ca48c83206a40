//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single upstream application requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Proxy route and response handling.
    pub proxy: ProxySettings,

    /// Signature verification and request limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Upstream application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Target origin (scheme + host + optional port), e.g. "http://localhost:3001".
    pub target_origin: String,

    /// Total time allowed for one upstream exchange, in seconds.
    pub timeout_secs: u64,

    /// Redirects followed before the last response is relayed as-is.
    pub max_redirects: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            target_origin: "http://localhost:3001".to_string(),
            timeout_secs: 30,
            max_redirects: 5,
        }
    }
}

/// Response handling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProxyMode {
    /// Rewrite root-relative paths in HTML bodies so they resolve through the storefront mount.
    #[default]
    HtmlRewrite,
    /// Leave bodies untouched and relabel HTML as `application/liquid`.
    Liquid,
}

impl ProxyMode {
    /// Query policy used when none is configured explicitly.
    pub fn default_query_policy(self) -> QueryPolicy {
        match self {
            ProxyMode::HtmlRewrite => QueryPolicy::StripPlatform,
            ProxyMode::Liquid => QueryPolicy::PreservePlatform,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProxyMode::HtmlRewrite => "html_rewrite",
            ProxyMode::Liquid => "liquid",
        }
    }
}

impl std::str::FromStr for ProxyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html_rewrite" | "html-rewrite" | "rewrite" => Ok(ProxyMode::HtmlRewrite),
            "liquid" => Ok(ProxyMode::Liquid),
            other => Err(format!("unknown proxy mode '{}'", other)),
        }
    }
}

/// Which platform-injected query parameters reach the upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPolicy {
    /// Remove every platform parameter.
    StripPlatform,
    /// Remove only `signature` and `timestamp`.
    PreservePlatform,
}

/// Proxy route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Route prefix the storefront platform forwards to (stripped before forwarding).
    pub route_prefix: String,

    /// Merchant-facing mount path, used when the request carries no `path_prefix`.
    pub external_path: String,

    /// Response handling strategy.
    pub mode: ProxyMode,

    /// Overrides the mode's query policy.
    pub query_policy: Option<QueryPolicy>,

    /// Overrides whether `x-forwarded-*` headers are sent upstream.
    pub forward_client_info: Option<bool>,

    /// Overrides whether `x-shopify-proxy-path` is sent upstream.
    pub expose_proxy_path: Option<bool>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            route_prefix: "/proxy".to_string(),
            external_path: "/apps/a".to_string(),
            mode: ProxyMode::default(),
            query_policy: None,
            forward_client_info: None,
            expose_proxy_path: None,
        }
    }
}

impl ProxySettings {
    pub fn query_policy(&self) -> QueryPolicy {
        self.query_policy
            .unwrap_or_else(|| self.mode.default_query_policy())
    }

    pub fn forward_client_info(&self) -> bool {
        self.forward_client_info
            .unwrap_or(self.mode == ProxyMode::HtmlRewrite)
    }

    pub fn expose_proxy_path(&self) -> bool {
        self.expose_proxy_path
            .unwrap_or(self.mode == ProxyMode::Liquid)
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Shared secret used to sign proxy requests. Empty disables verification.
    pub shared_secret: Option<String>,

    /// Signatures are only enforced in production.
    pub environment: Environment,

    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            shared_secret: None,
            environment: Environment::default(),
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl SecurityConfig {
    /// The configured secret, treating an empty string as absent.
    pub fn secret(&self) -> Option<&str> {
        self.shared_secret
            .as_deref()
            .filter(|s| !s.is_empty())
    }

    pub fn enforce_signature(&self) -> bool {
        self.environment == Environment::Production
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
