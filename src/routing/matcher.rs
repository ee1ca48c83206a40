//! Proxy route prefix matching.
//!
//! # Responsibilities
//! - Match the configured proxy route prefix (case-sensitive)
//! - Strip the prefix to obtain the upstream path
//!
//! # Design Decisions
//! - Prefix matching respects segment boundaries (`/proxyfoo` is not `/proxy`)
//! - No normalization of the remainder; the upstream is trusted with `..`
//! - The rewritten path always starts with `/`

/// The route the storefront platform forwards app proxy traffic to.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. Trailing slashes are ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        Self {
            prefix: if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() },
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if `path` is the prefix itself or lies beneath it.
    pub fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || self.prefix == "/",
            None => false,
        }
    }

    /// Upstream path for an inbound `path`.
    pub fn rewrite(&self, path: &str) -> String {
        let rest = path.strip_prefix(self.prefix.as_str()).unwrap_or(path);
        if rest.is_empty() {
            "/".to_string()
        } else if rest.starts_with('/') {
            rest.to_string()
        } else {
            format!("/{}", rest)
        }
    }
}

/// Returns true if `path` is rooted and safe to splice into an HTML attribute
/// or a header value: no whitespace, control characters, quotes, backticks,
/// backslashes or angle brackets.
pub fn is_plain_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.chars().any(|c| {
            c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '`' | '<' | '>' | '\\')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite() {
        let matcher = PathPrefixMatcher::new("/proxy");
        assert_eq!(matcher.rewrite("/proxy"), "/");
        assert_eq!(matcher.rewrite("/proxy/"), "/");
        assert_eq!(matcher.rewrite("/proxy/campaigns/test"), "/campaigns/test");
        assert_eq!(matcher.rewrite("/proxy/_nuxt/app.js"), "/_nuxt/app.js");
    }

    #[test]
    fn test_rewrite_keeps_dot_segments() {
        let matcher = PathPrefixMatcher::new("/proxy");
        assert_eq!(matcher.rewrite("/proxy/a/../b"), "/a/../b");
    }

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/proxy/");
        assert_eq!(matcher.prefix(), "/proxy");
        assert!(matcher.matches("/proxy"));
        assert!(matcher.matches("/proxy/x"));
        assert!(!matcher.matches("/proxyfoo"));
        assert!(!matcher.matches("/images"));
    }

    #[test]
    fn test_plain_path() {
        assert!(is_plain_path("/apps/a"));
        assert!(is_plain_path("/apps/caf%C3%A9"));
        assert!(is_plain_path("/"));
        assert!(!is_plain_path("apps/a"));
        assert!(!is_plain_path("/\"><script>alert(1)</script>"));
        assert!(!is_plain_path("/a' onload='x"));
        assert!(!is_plain_path("/a b"));
        assert!(!is_plain_path("/a\nb"));
    }

    #[test]
    fn test_rewrite_always_rooted() {
        let matcher = PathPrefixMatcher::new("/proxy");
        for path in ["/proxy", "/proxyfoo", "/other", ""] {
            assert!(matcher.rewrite(path).starts_with('/'), "{}", path);
        }
    }
}
