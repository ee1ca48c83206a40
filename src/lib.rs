//! App proxy gateway library.
//!
//! Embeds a backend web application under a storefront subpath: requests the
//! storefront platform forwards to the proxy route are signature-checked,
//! rewritten and relayed to a single upstream, and the upstream's response is
//! relayed back after optional HTML or content-type rewriting.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use error::{GatewayError, UpstreamError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
