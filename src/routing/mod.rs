//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query)
//!     → matcher.rs (strip the proxy route prefix)
//!     → query.rs (parse, extract platform parameters, sanitize)
//!     → target.rs (ForwardingTarget: origin + path + residual query)
//! ```
//!
//! # Design Decisions
//! - Exactly one upstream and one route prefix per instance
//! - Computed per request, nothing is cached
//! - Deterministic: same input always yields the same target

pub mod matcher;
pub mod query;
pub mod target;

pub use matcher::{is_plain_path, PathPrefixMatcher};
pub use query::{ProxyParameters, QueryParams};
pub use target::ForwardingTarget;
