//! JSON-RPC client plumbing for the provisioning backend: authentication,
//! client options, wire payloads, and call metrics.

pub mod auth;
pub mod client;
pub mod metrics;
pub mod options;
pub mod payload;

pub use client::{ApiClient, ApiError};
pub use metrics::ApiMetricsSnapshot;
pub use options::ApiClientOptions;
