//! Response rewriting strategies.
//!
//! A deployment runs exactly one strategy, chosen by `proxy.mode`:
//! - [`HtmlPathRewrite`] prefixes root-relative references in HTML bodies with
//!   the storefront mount path and injects a `<base>` tag.
//! - [`LiquidRelabel`] leaves bodies alone and relabels HTML as
//!   `application/liquid` so the storefront renders it as a template.
//!
//! The path rewrite is a textual heuristic, not an HTML parser. Protocol-relative
//! URLs, deeper absolute paths and paths inside inline scripts get the same
//! prefix substitution or none at all. Running it twice double-prefixes.

use std::fmt::Debug;

use axum::body::Bytes;
use axum::http::{header, HeaderValue};
use axum::response::Response;

use crate::config::ProxyMode;
use crate::error::GatewayError;
use crate::http::response::{json_error, liquid_error, OutboundResponse, LIQUID_CONTENT_TYPE};

/// Per-response strategy applied after the upstream exchange.
pub trait ResponseStrategy: Send + Sync + Debug {
    /// Label for logs and metrics.
    fn name(&self) -> &'static str;

    /// Transform `response` in place. Returns true if anything changed.
    fn apply(&self, response: &mut OutboundResponse, external_path: &str) -> bool;

    /// Fixed failure response for this strategy.
    fn render_error(&self, err: &GatewayError) -> Response;
}

/// Strategy for `mode`.
pub fn strategy_for(mode: ProxyMode) -> Box<dyn ResponseStrategy> {
    match mode {
        ProxyMode::HtmlRewrite => Box::new(HtmlPathRewrite),
        ProxyMode::Liquid => Box::new(LiquidRelabel),
    }
}

fn is_html(response: &OutboundResponse) -> bool {
    response
        .content_type()
        .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
        .unwrap_or(false)
}

/// Rewrites root-relative references in HTML so they resolve through the mount path.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlPathRewrite;

/// Pattern and the byte offset of the `/` the mount path is inserted before.
const REWRITE_PATTERNS: &[(&str, usize)] = &[
    ("\"/_nuxt/", 1),
    ("'/_nuxt/", 1),
    ("href=\"/", 6),
    ("src=\"/", 5),
];

impl HtmlPathRewrite {
    /// Rewrite `html` for a gateway mounted at `external_path`.
    pub fn rewrite_html(html: &str, external_path: &str) -> String {
        let mount = external_path.trim_end_matches('/');
        let rewritten = prefix_paths(html, mount);
        inject_base(rewritten, mount)
    }
}

impl ResponseStrategy for HtmlPathRewrite {
    fn name(&self) -> &'static str {
        "html_rewrite"
    }

    fn apply(&self, response: &mut OutboundResponse, external_path: &str) -> bool {
        if !is_html(response) {
            return false;
        }
        let html = match std::str::from_utf8(&response.body) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(error = %e, "HTML body is not valid UTF-8, relaying unchanged");
                return false;
            }
        };
        let rewritten = Self::rewrite_html(html, external_path);
        response.body = Bytes::from(rewritten);
        true
    }

    fn render_error(&self, err: &GatewayError) -> Response {
        json_error(err)
    }
}

/// Single left-to-right pass so overlapping patterns (`src="/_nuxt/`) are
/// prefixed once.
fn prefix_paths(html: &str, mount: &str) -> String {
    if mount.is_empty() {
        return html.to_string();
    }

    let mut out = String::with_capacity(html.len() + html.len() / 16);
    let mut next: Vec<Option<usize>> = REWRITE_PATTERNS
        .iter()
        .map(|(pat, _)| html.find(pat))
        .collect();
    let mut copied = 0;

    loop {
        let earliest = next
            .iter()
            .enumerate()
            .filter_map(|(i, pos)| pos.map(|p| (p, i)))
            .min();
        let (pos, idx) = match earliest {
            Some(found) => found,
            None => break,
        };

        let (pattern, insert_at) = REWRITE_PATTERNS[idx];
        let split = pos + insert_at;
        out.push_str(&html[copied..split]);
        out.push_str(mount);
        copied = split;

        // Refresh every cached position the consumed match overlaps.
        let resume = pos + pattern.len();
        for (i, cached) in next.iter_mut().enumerate() {
            if matches!(cached, Some(p) if *p < resume) {
                let pat = REWRITE_PATTERNS[i].0;
                *cached = html[resume..].find(pat).map(|p| p + resume);
            }
        }
    }

    out.push_str(&html[copied..]);
    out
}

/// Add `<base href="{mount}/">` right after the opening `<head>` tag unless the
/// document already declares a base.
fn inject_base(html: String, mount: &str) -> String {
    let lower = html.to_ascii_lowercase();
    if lower.contains("<base") {
        return html;
    }

    let head_end = match find_head_open(&lower) {
        Some(end) => end,
        None => return html,
    };

    let mut out = String::with_capacity(html.len() + mount.len() + 16);
    out.push_str(&html[..head_end]);
    out.push_str(&format!("<base href=\"{}/\">", mount));
    out.push_str(&html[head_end..]);
    out
}

/// Byte offset just past the `>` of the first `<head>` tag (not `<header>`).
fn find_head_open(lower: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(found) = lower[from..].find("<head") {
        let start = from + found;
        let after = start + "<head".len();
        match lower.as_bytes().get(after) {
            Some(b'>') => return Some(after + 1),
            Some(b) if b.is_ascii_whitespace() => {
                return lower[after..].find('>').map(|p| after + p + 1);
            }
            _ => from = after,
        }
    }
    None
}

/// Relabels HTML responses as `application/liquid`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiquidRelabel;

impl ResponseStrategy for LiquidRelabel {
    fn name(&self) -> &'static str {
        "liquid"
    }

    fn apply(&self, response: &mut OutboundResponse, _external_path: &str) -> bool {
        if !is_html(response) {
            return false;
        }
        response.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(LIQUID_CONTENT_TYPE),
        );
        true
    }

    fn render_error(&self, err: &GatewayError) -> Response {
        liquid_error(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};

    fn html_response(content_type: &str, body: &str) -> OutboundResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        OutboundResponse {
            status: StatusCode::OK,
            headers,
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_href_and_src_rewrite() {
        let out = HtmlPathRewrite::rewrite_html(
            r#"<a href="/about">About</a><img src="/logo.png"><a href="https://x.com/">x</a>"#,
            "/apps/a",
        );
        assert!(out.contains(r#"href="/apps/a/about""#));
        assert!(out.contains(r#"src="/apps/a/logo.png""#));
        assert!(out.contains(r#"href="https://x.com/""#));
    }

    #[test]
    fn test_nuxt_assets_rewrite() {
        let out = HtmlPathRewrite::rewrite_html(
            r#"<script>window.__NUXT__={path:"/_nuxt/",chunk:'/_nuxt/b.js'}</script>"#,
            "/apps/a",
        );
        assert!(out.contains(r#""/apps/a/_nuxt/""#));
        assert!(out.contains("'/apps/a/_nuxt/b.js'"));
    }

    #[test]
    fn test_overlapping_patterns_prefixed_once() {
        let out = HtmlPathRewrite::rewrite_html(
            r#"<script src="/_nuxt/entry.js"></script><link href="/_nuxt/a.css">"#,
            "/apps/a",
        );
        assert_eq!(
            out,
            r#"<script src="/apps/a/_nuxt/entry.js"></script><link href="/apps/a/_nuxt/a.css">"#
        );
        assert!(!out.contains("/apps/a/apps/a"));
    }

    #[test]
    fn test_root_href() {
        let out = HtmlPathRewrite::rewrite_html(r#"<a href="/">Home</a>"#, "/apps/a/");
        assert_eq!(out, r#"<a href="/apps/a/">Home</a>"#);
    }

    #[test]
    fn test_protocol_relative_is_not_special_cased() {
        let out = HtmlPathRewrite::rewrite_html(r#"<script src="//cdn.example.com/x.js">"#, "/apps/a");
        assert_eq!(out, r#"<script src="/apps/a//cdn.example.com/x.js">"#);
    }

    #[test]
    fn test_base_injected_after_head() {
        let out = HtmlPathRewrite::rewrite_html(
            "<html><head><title>t</title></head><body><header>h</header></body></html>",
            "/apps/a",
        );
        assert!(out.contains(r#"<head><base href="/apps/a/"><title>"#));
        assert_eq!(out.matches("<base").count(), 1);
    }

    #[test]
    fn test_base_injected_after_head_with_attributes() {
        let out = HtmlPathRewrite::rewrite_html(r#"<HEAD lang="en"><meta charset="utf-8">"#, "/apps/a");
        assert_eq!(out, r#"<HEAD lang="en"><base href="/apps/a/"><meta charset="utf-8">"#);
    }

    #[test]
    fn test_existing_base_kept() {
        let html = r#"<head><base href="/custom/"></head>"#;
        let out = HtmlPathRewrite::rewrite_html(html, "/apps/a");
        assert_eq!(out.matches("<base").count(), 1);
        assert!(out.contains(r#"<base href="/apps/a/custom/">"#));
    }

    #[test]
    fn test_no_head_no_base() {
        let out = HtmlPathRewrite::rewrite_html("<header>x</header><p>fragment</p>", "/apps/a");
        assert!(!out.contains("<base"));
    }

    #[test]
    fn test_rewrite_applies_once_per_call() {
        let once = HtmlPathRewrite::rewrite_html(r#"<a href="/x">"#, "/apps/a");
        let twice = HtmlPathRewrite::rewrite_html(&once, "/apps/a");
        assert_eq!(once, r#"<a href="/apps/a/x">"#);
        assert_eq!(twice, r#"<a href="/apps/a/apps/a/x">"#);
    }

    #[test]
    fn test_html_strategy_skips_non_html() {
        let mut response = html_response("application/json", r#"{"href":"/x"}"#);
        assert!(!HtmlPathRewrite.apply(&mut response, "/apps/a"));
        assert_eq!(&response.body[..], br#"{"href":"/x"}"#);
    }

    #[test]
    fn test_html_strategy_rewrites_body() {
        let mut response = html_response("text/html; charset=utf-8", r#"<head></head><a href="/about">"#);
        assert!(HtmlPathRewrite.apply(&mut response, "/apps/a"));
        let body = std::str::from_utf8(&response.body).unwrap();
        assert!(body.contains(r#"href="/apps/a/about""#));
        assert_eq!(response.content_type(), Some("text/html; charset=utf-8"));
    }

    #[test]
    fn test_html_strategy_leaves_invalid_utf8() {
        let mut response = html_response("text/html", "");
        response.body = Bytes::from_static(&[0xff, 0xfe, b'<']);
        assert!(!HtmlPathRewrite.apply(&mut response, "/apps/a"));
        assert_eq!(&response.body[..], &[0xff, 0xfe, b'<']);
    }

    #[test]
    fn test_liquid_relabel() {
        let body = r#"<a href="/about">{{ shop.name }}</a>"#;
        let mut response = html_response("text/html; charset=utf-8", body);
        assert!(LiquidRelabel.apply(&mut response, "/apps/a"));
        assert_eq!(response.content_type(), Some(LIQUID_CONTENT_TYPE));
        assert_eq!(&response.body[..], body.as_bytes());

        let mut json = html_response("application/json", "{}");
        assert!(!LiquidRelabel.apply(&mut json, "/apps/a"));
        assert_eq!(json.content_type(), Some("application/json"));
    }

    #[test]
    fn test_strategy_for_mode() {
        assert_eq!(strategy_for(ProxyMode::HtmlRewrite).name(), "html_rewrite");
        assert_eq!(strategy_for(ProxyMode::Liquid).name(), "liquid");
    }
}
