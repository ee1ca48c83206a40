//! Upstream URL construction.

use axum::http::Uri;

use crate::config::QueryPolicy;
use crate::error::GatewayResult;
use crate::routing::matcher::PathPrefixMatcher;
use crate::routing::query::QueryParams;

/// Where a single inbound request is forwarded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardingTarget {
    /// Configured upstream origin without a trailing slash.
    pub origin: String,
    /// Inbound path with the proxy route prefix stripped.
    pub path: String,
    /// Parameters the upstream is allowed to see.
    pub query: QueryParams,
}

impl ForwardingTarget {
    pub fn new(
        origin: &str,
        route: &PathPrefixMatcher,
        inbound_path: &str,
        inbound_query: &QueryParams,
        policy: QueryPolicy,
    ) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            path: route.rewrite(inbound_path),
            query: inbound_query.sanitized(policy),
        }
    }

    /// Full upstream URI. No query string is attached when nothing remains.
    ///
    /// The path is carried exactly as received: `.` and `..` segments reach
    /// the upstream unresolved.
    pub fn uri(&self) -> GatewayResult<Uri> {
        let mut uri = format!("{}{}", self.origin, self.path);
        if !self.query.is_empty() {
            uri.push('?');
            uri.push_str(&self.query.to_query_string());
        }
        Ok(Uri::try_from(uri)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(path: &str, query: &str, policy: QueryPolicy) -> ForwardingTarget {
        ForwardingTarget::new(
            "http://localhost:3001/",
            &PathPrefixMatcher::new("/proxy"),
            path,
            &QueryParams::parse(Some(query)),
            policy,
        )
    }

    #[test]
    fn test_url_without_query() {
        let t = target("/proxy", "signature=abc&timestamp=1&shop=x", QueryPolicy::StripPlatform);
        let uri = t.uri().unwrap();
        assert_eq!(uri.to_string(), "http://localhost:3001/");
        assert!(uri.query().is_none());
    }

    #[test]
    fn test_url_with_residual_query() {
        let t = target(
            "/proxy/campaigns/test",
            "shop=x.myshopify.com&signature=abc&timestamp=1&path_prefix=%2Fapps%2Fa&foo=bar",
            QueryPolicy::StripPlatform,
        );
        assert_eq!(
            t.uri().unwrap().to_string(),
            "http://localhost:3001/campaigns/test?foo=bar"
        );
    }

    #[test]
    fn test_url_preserving_platform_params() {
        let t = target(
            "/proxy/_nuxt/app.js",
            "shop=x.myshopify.com&signature=abc&timestamp=1&foo=bar",
            QueryPolicy::PreservePlatform,
        );
        assert_eq!(
            t.uri().unwrap().to_string(),
            "http://localhost:3001/_nuxt/app.js?shop=x.myshopify.com&foo=bar"
        );
    }

    #[test]
    fn test_uri_keeps_dot_segments() {
        let t = target("/proxy/a/../b/./c", "", QueryPolicy::StripPlatform);
        let uri = t.uri().unwrap();
        assert_eq!(uri.path(), "/a/../b/./c");
        assert_eq!(uri.to_string(), "http://localhost:3001/a/../b/./c");
    }
}
