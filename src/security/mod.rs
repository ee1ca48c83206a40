//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → signature.rs (verify the app proxy signature, production only)
//!     → headers.rs (fresh upstream header set, X-Forwarded-*)
//!     → Pass to forwarding
//!
//! Upstream response:
//!     → headers.rs (strip transport framing headers)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a configured secret with a bad signature is always a 401
//! - No trust in client input: inbound headers are allow-listed, never copied

pub mod headers;
pub mod signature;
