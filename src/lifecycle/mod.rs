//! Process lifecycle.
//!
//! ```text
//! main.rs:     config → logging → metrics → bind → serve
//! signals.rs:  SIGINT / SIGTERM → Shutdown::trigger
//! shutdown.rs: trigger → axum stops accepting → in-flight requests finish
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
