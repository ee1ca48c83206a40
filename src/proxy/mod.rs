//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → forwarder.rs (signature gate, target, headers)
//!     → upstream call (hyper client: redirects followed, bodies decoded, one deadline)
//!     → rewrite.rs (configured ResponseStrategy)
//!     → OutboundResponse
//! ```
//!
//! # Design Decisions
//! - One strategy per deployment, chosen at startup
//! - New strategies plug in through `ResponseStrategy` without touching forwarding
//! - Requests share only the forwarder and its connection pool

pub mod forwarder;
pub mod rewrite;

pub use forwarder::{Forwarder, UpstreamResponse};
pub use rewrite::{strategy_for, HtmlPathRewrite, LiquidRelabel, ResponseStrategy};
