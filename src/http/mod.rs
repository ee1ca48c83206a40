//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → request.rs (buffer into InboundRequest)
//!     → [forwarding engine verifies and forwards]
//!     → response.rs (relay, or render the fixed failure response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{InboundRequest, X_REQUEST_ID};
pub use response::{OutboundResponse, LIQUID_CONTENT_TYPE};
pub use server::HttpServer;
