//! Logs and metrics.
//!
//! Every request gets an `x-request-id` at the edge (see `http::server`);
//! pipeline log events carry it as the `request_id` field. Metrics recording
//! is a no-op unless the Prometheus exporter was installed at startup.

pub mod logging;
pub mod metrics;
