//! Query parameter handling.
//!
//! # Responsibilities
//! - Parse the inbound query string into an ordered name → value mapping
//! - Extract the platform-injected proxy parameters
//! - Remove parameters that must never reach the upstream
//!
//! # Design Decisions
//! - Duplicate names are not supported; the last occurrence wins
//! - Percent-decoding happens once, at parse time, and never again

use url::form_urlencoded;

use crate::config::QueryPolicy;

pub const SHOP: &str = "shop";
pub const PATH_PREFIX: &str = "path_prefix";
pub const TIMESTAMP: &str = "timestamp";
pub const SIGNATURE: &str = "signature";
pub const LOGGED_IN_CUSTOMER_ID: &str = "logged_in_customer_id";

/// Parameters only the gateway consumes.
const PROXY_INTERNAL: &[&str] = &[SIGNATURE, TIMESTAMP];

/// Every parameter the storefront platform injects.
const PLATFORM_INJECTED: &[&str] = &[SHOP, PATH_PREFIX, TIMESTAMP, SIGNATURE, LOGGED_IN_CUSTOMER_ID];

/// Ordered query parameter mapping with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse a raw (still percent-encoded) query string.
    pub fn parse(query: Option<&str>) -> Self {
        query
            .map(|q| {
                form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set `name` to `value`, replacing an existing entry in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.pairs.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self.pairs.iter().position(|(k, _)| k == name)?;
        Some(self.pairs.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encode back into `application/x-www-form-urlencoded` form.
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }

    /// Copy of the parameters the upstream is allowed to see under `policy`.
    pub fn sanitized(&self, policy: QueryPolicy) -> QueryParams {
        let blocked = match policy {
            QueryPolicy::StripPlatform => PLATFORM_INJECTED,
            QueryPolicy::PreservePlatform => PROXY_INTERNAL,
        };
        self.pairs
            .iter()
            .filter(|(k, _)| !blocked.contains(&k.as_str()))
            .cloned()
            .collect()
    }
}

impl FromIterator<(String, String)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut params = QueryParams::default();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Platform-injected parameters of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyParameters {
    pub shop: Option<String>,
    pub path_prefix: Option<String>,
    pub timestamp: Option<String>,
    pub signature: Option<String>,
    pub logged_in_customer_id: Option<String>,
}

impl ProxyParameters {
    pub fn extract(params: &QueryParams) -> Self {
        let owned = |name: &str| params.get(name).map(str::to_string);
        Self {
            shop: owned(SHOP),
            path_prefix: owned(PATH_PREFIX),
            timestamp: owned(TIMESTAMP),
            signature: owned(SIGNATURE),
            logged_in_customer_id: owned(LOGGED_IN_CUSTOMER_ID),
        }
    }
}
