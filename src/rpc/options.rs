//! Configurable knobs for the RPC client along with validation helpers so
//! callers can reason about timeouts, concurrency, and payload limits.
//!
//! No retry knobs: jobs are not idempotent and the client performs exactly
//! one request per call.

use anyhow::{bail, Result};
use std::time::Duration;

pub const DEFAULT_HTTP_BODY_LIMIT_BYTES: usize = 4 * 1024 * 1024;
const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct ApiClientOptions {
    pub request_timeout: Duration,
    pub max_concurrent_requests: usize,
    pub max_request_body_bytes: usize,
    pub max_response_body_bytes: usize,
}

impl Default for ApiClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            max_request_body_bytes: DEFAULT_HTTP_BODY_LIMIT_BYTES,
            max_response_body_bytes: DEFAULT_HTTP_BODY_LIMIT_BYTES,
        }
    }
}

impl ApiClientOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than 0");
        }
        if self.max_concurrent_requests == 0 {
            bail!("max_concurrent_requests must be greater than 0");
        }
        if self.max_request_body_bytes == 0 {
            bail!("max_request_body_bytes must be greater than 0");
        }
        if self.max_response_body_bytes == 0 {
            bail!("max_response_body_bytes must be greater than 0");
        }
        Ok(())
    }
}
